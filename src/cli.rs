use crate::messaging::Message;
use clap::{Arg, ArgMatches, Command};
use std::ffi::OsString;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub html: Option<PathBuf>,
    pub url: Option<Url>,
    pub profile: Option<PathBuf>,
    pub store: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub action: Message,
    pub no_ai: bool,
    pub verbose: bool,
    pub bindings: bool,
}

impl CliArgs {
    pub fn parse() -> Result<Self, String> {
        let matches = Self::command().get_matches();
        Self::from_matches(&matches)
    }

    pub fn try_parse_from<I, T>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command()
            .try_get_matches_from(args)
            .map_err(|e| e.to_string())?;
        Self::from_matches(&matches)
    }

    fn command() -> Command {
        Command::new("job-autofill")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Detects job application forms in a saved page and fills them from a stored profile")
            .arg(
                Arg::new("html")
                    .long("html")
                    .value_name("FILE")
                    .help("Saved HTML of the application page")
                    .value_parser(clap::value_parser!(PathBuf))
                    .required_unless_present("bindings"),
            )
            .arg(
                Arg::new("url")
                    .long("url")
                    .value_name("URL")
                    .help("Address the page was loaded from; selects site-specific patterns")
                    .required_unless_present("bindings"),
            )
            .arg(
                Arg::new("profile")
                    .long("profile")
                    .value_name("FILE")
                    .help("Profile JSON to import into the store before running")
                    .value_parser(clap::value_parser!(PathBuf)),
            )
            .arg(
                Arg::new("store")
                    .long("store")
                    .value_name("FILE")
                    .help("JSON store holding profile, options and saved answers")
                    .value_parser(clap::value_parser!(PathBuf)),
            )
            .arg(
                Arg::new("timeout-secs")
                    .long("timeout-secs")
                    .value_name("SECS")
                    .help("Upper bound for each essay generation call")
                    .value_parser(clap::value_parser!(u64).range(1..)),
            )
            .arg(
                Arg::new("action")
                    .long("action")
                    .value_name("ACTION")
                    .help("Message to send to the page agent")
                    .value_parser(["findJobForm", "autofillWithStoredProfile", "analyzeNow"])
                    .default_value("autofillWithStoredProfile"),
            )
            .arg(
                Arg::new("no-ai")
                    .long("no-ai")
                    .help("Answer essay questions with canned text instead of calling a service")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new("verbose")
                    .long("verbose")
                    .help("Enable debug logging of per-field decisions")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new("bindings")
                    .long("bindings")
                    .help("Print TypeScript declarations of the message types and exit")
                    .action(clap::ArgAction::SetTrue),
            )
    }

    fn from_matches(matches: &ArgMatches) -> Result<Self, String> {
        let url = matches
            .get_one::<String>("url")
            .map(|url| Self::validate_url(url))
            .transpose()?;
        let action = matches
            .get_one::<String>("action")
            .map(|action| Self::parse_action(action))
            .transpose()?
            .unwrap_or(Message::AutofillWithStoredProfile);

        Ok(CliArgs {
            html: matches.get_one::<PathBuf>("html").cloned(),
            url,
            profile: matches.get_one::<PathBuf>("profile").cloned(),
            store: matches.get_one::<PathBuf>("store").cloned(),
            timeout_secs: matches.get_one::<u64>("timeout-secs").copied(),
            action,
            no_ai: matches.get_flag("no-ai"),
            verbose: matches.get_flag("verbose"),
            bindings: matches.get_flag("bindings"),
        })
    }

    fn validate_url(url: &str) -> Result<Url, String> {
        let parsed = Url::parse(url).map_err(|_| format!("Invalid URL: {url}"))?;
        match parsed.scheme() {
            "http" | "https" | "file" => Ok(parsed),
            scheme => Err(format!("Unsupported URL scheme '{scheme}': {url}")),
        }
    }

    fn parse_action(action: &str) -> Result<Message, String> {
        match action {
            "findJobForm" => Ok(Message::FindJobForm),
            "autofillWithStoredProfile" => Ok(Message::AutofillWithStoredProfile),
            "analyzeNow" => Ok(Message::AnalyzeNow),
            other => Err(format!("Unknown action: {other}")),
        }
    }
}
