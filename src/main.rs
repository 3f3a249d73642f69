use std::fs;

use clap::{Arg, Command};
use mrkdwn_i18n::{AccentedPseudo, MemoryStore, MrkdwnDocument, PseudoTranslator, Settings};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let matches = Command::new("mrkdwn-i18n")
        .version("0.1.0")
        .about("Extract and localize mrkdwn markup embedded in JSON documents")
        .subcommand_required(true)
        .subcommand(
            Command::new("extract")
                .about("Extract translatable resources from a document")
                .arg(
                    Arg::new("file")
                        .help("Source JSON document")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("settings")
                        .long("settings")
                        .short('s')
                        .help("Project settings JSON file"),
                ),
        )
        .subcommand(
            Command::new("localize")
                .about("Assemble a localized copy of a document")
                .arg(
                    Arg::new("file")
                        .help("Source JSON document")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("locale")
                        .long("locale")
                        .short('l')
                        .help("Target locale (e.g. fr-FR)")
                        .required(true),
                )
                .arg(
                    Arg::new("translations")
                        .long("translations")
                        .short('t')
                        .help("JSON object mapping resource keys to translated placeholder-strings"),
                )
                .arg(
                    Arg::new("settings")
                        .long("settings")
                        .short('s')
                        .help("Project settings JSON file"),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Write the localized document here instead of stdout"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("extract", sub)) => {
            let file = sub.get_one::<String>("file").expect("required arg");
            let settings = load_settings(sub.get_one::<String>("settings"))?;
            let text = fs::read_to_string(file)?;
            let document = MrkdwnDocument::parse(&text, settings)?;
            println!("{}", serde_json::to_string_pretty(document.resources())?);
        }
        Some(("localize", sub)) => {
            let file = sub.get_one::<String>("file").expect("required arg");
            let locale = sub.get_one::<String>("locale").expect("required arg");
            let settings = load_settings(sub.get_one::<String>("settings"))?;
            let text = fs::read_to_string(file)?;
            let document = MrkdwnDocument::parse(&text, settings)?;

            let mut store = MemoryStore::new();
            if let Some(path) = sub.get_one::<String>("translations") {
                let raw = fs::read_to_string(path)?;
                let entries: std::collections::HashMap<String, String> =
                    serde_json::from_str(&raw)?;
                for (key, target) in &entries {
                    store.add_translation(
                        &document.settings().project,
                        locale,
                        key,
                        mrkdwn_i18n::DATA_TYPE,
                        target,
                    );
                }
            }

            let pseudo = document
                .settings()
                .pseudo_locale
                .as_deref()
                .filter(|pseudo_locale| pseudo_locale == locale)
                .map(|_| AccentedPseudo::new(&document.settings().source_locale));
            let localized = document.localize(
                &store,
                pseudo.as_ref().map(|p| p as &dyn PseudoTranslator),
                locale,
            )?;

            for warning in &localized.warnings {
                eprintln!("warning: {}", warning);
            }
            if !localized.fully_translated {
                eprintln!(
                    "note: {} resource(s) had no translation for {}",
                    localized.new_resources.len(),
                    locale
                );
            }

            match sub.get_one::<String>("output") {
                Some(path) => fs::write(path, &localized.text)?,
                None => print!("{}", localized.text),
            }
        }
        _ => unreachable!("subcommand required"),
    }

    Ok(())
}

fn load_settings(path: Option<&String>) -> Result<Settings, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(Settings::default()),
    }
}
