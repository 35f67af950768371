use std::collections::HashMap;

use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use unic_langid::LanguageIdentifier;

const EN_MESSAGES: &str = include_str!("../locales/en/main.ftl");

/// Localization manager for the VIP Link Bot
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
    default_language: String,
}

impl LocalizationManager {
    /// Create a new localization manager with the embedded English messages
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();

        let en_locale: LanguageIdentifier = "en".parse()?;
        bundles.insert("en".to_string(), Self::create_bundle(en_locale, EN_MESSAGES)?);

        Ok(Self {
            bundles,
            default_language: "en".to_string(),
        })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(locale: LanguageIdentifier, source: &str) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Telegram renders the Unicode isolation marks literally
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("Failed to parse messages: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Failed to add messages: {errors:?}"))?;

        Ok(bundle)
    }

    /// Get a localized message, falling back to English for unknown languages
    pub fn get_message_in_language(&self, key: &str, language: &str, args: Option<&[(&str, &str)]>) -> String {
        let bundle = match self
            .bundles
            .get(language)
            .or_else(|| self.bundles.get(&self.default_language))
        {
            Some(bundle) => bundle,
            None => return format!("Missing translation: {key}"),
        };

        let pattern = match bundle.get_message(key).and_then(|msg| msg.value()) {
            Some(pattern) => pattern,
            None => return format!("Missing translation: {key}"),
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, FluentValue::from(*value));
            }
            fluent_args
        });

        let mut errors = vec![];
        bundle
            .format_pattern(pattern, fluent_args.as_ref(), &mut errors)
            .into_owned()
    }

    /// Get a message in the default language
    pub fn message(&self, key: &str) -> String {
        self.get_message_in_language(key, &self.default_language, None)
    }

    /// Get a message in the default language with simple string arguments
    pub fn message_with_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        self.get_message_in_language(key, &self.default_language, Some(args))
    }
}
