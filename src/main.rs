use job_autofill::{
    bindings::generate_typescript_bindings, cli::CliArgs, utils::truncate_chars, AssistantConfig,
    Autofiller, ContentAgent, HtmlDocument, JsonFileStore, Profile, ProfileStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let args = match CliArgs::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    if args.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    if args.bindings {
        print!("{}", generate_typescript_bindings());
        return;
    }

    if let Err(e) = run(args).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AssistantConfig::from_env()?;
    if let Some(store) = &args.store {
        config.store_path = store.clone();
    }

    let store = Arc::new(JsonFileStore::new(config.store_path.clone()));
    info!("Using store {}", store.path().display());

    if let Some(path) = &args.profile {
        let profile: Profile = serde_json::from_str(&tokio::fs::read_to_string(path).await?)?;
        store.save_profile(&profile).await?;
        info!("Imported profile from {}", path.display());
    }
    if let Err(e) = store.cleanup().await {
        warn!("Failed to clean up job-form log: {}", e);
    }

    config = config.with_options(&store.get_options().await?);
    if args.no_ai {
        config = config.without_ai();
    }
    if let Some(secs) = args.timeout_secs {
        config.generation_timeout = Duration::from_secs(secs);
    }

    let (Some(html_path), Some(url)) = (&args.html, &args.url) else {
        return Err("--html and --url are required".into());
    };
    let html = tokio::fs::read_to_string(html_path).await?;
    let document = HtmlDocument::parse(&html, url.clone());
    info!("Loaded {} ({} elements)", url, document.element_count());

    let autofiller = Autofiller::new(config.generator(), config.autofill_config());
    let mut agent = ContentAgent::new(document, store, autofiller);
    let response = agent.handle(args.action.clone()).await;

    println!("{}", serde_json::to_string_pretty(&response)?);

    let written = agent.dom().written_values();
    if !written.is_empty() {
        println!("\n{:-^60}", " FILLED FIELDS ");
        for (element, value) in written {
            println!("{}: {}", agent.dom().describe(element), truncate_chars(value, 80));
        }
    }
    for (input, files) in agent.dom().attached_files() {
        for file in files {
            println!("{}: <{}, {} bytes>", agent.dom().describe(input), file.name, file.bytes.len());
        }
    }

    Ok(())
}
