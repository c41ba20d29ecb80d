//! HTML generation for the text, image and generic template views.
//!
//! Templates are a closed set embedded at compile time; variables use the
//! `${NAME}` form and every variable must resolve, otherwise rendering fails
//! before any surface is touched.

use std::collections::HashMap;
use std::str::FromStr;

use crate::config::DisplayConfig;
use crate::errors::DisplayError;

/// The known display templates.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Template {
    TextView,
    ImageView,
}

impl Template {
    fn source(&self) -> &'static str {
        match self {
            Template::TextView => include_str!("../templates/text_view.html"),
            Template::ImageView => include_str!("../templates/image_view.html"),
        }
    }
}

impl FromStr for Template {
    type Err = DisplayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TEXT_VIEW" => Ok(Template::TextView),
            "IMAGE_VIEW" => Ok(Template::ImageView),
            other => Err(DisplayError::UnknownTemplate(other.to_owned())),
        }
    }
}

/// Severity of a text preset, mapped to the colors the display has always
/// used for them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Severity {
    Plain,
    Info,
    Warn,
    Error,
}

impl Severity {
    fn css_color(&self) -> &'static str {
        match self {
            Severity::Plain => "rgb(0,0,0)",
            Severity::Info => "rgb(23,97,23)",
            Severity::Warn => "rgb(255,165,0)",
            Severity::Error => "rgb(178,0,0)",
        }
    }
}

/// Renders markup for the closed template set, seeding every render with the
/// ambient variables (`APP`, `SCREEN_WIDTH`, `SCREEN_HEIGHT`).
pub struct TemplateEngine {
    base: HashMap<String, String>,
}

impl TemplateEngine {
    pub fn new(config: &DisplayConfig) -> Self {
        let mut base = HashMap::new();
        base.insert("APP".to_owned(), config.app_name.clone());
        base.insert("SCREEN_WIDTH".to_owned(), config.screen_width.to_string());
        base.insert("SCREEN_HEIGHT".to_owned(), config.screen_height.to_string());
        Self { base }
    }

    /// Markup for a fullscreen text message in the severity's color.
    pub fn text_view(&self, text: &str, severity: Severity) -> Result<String, DisplayError> {
        let mut variables = HashMap::new();
        variables.insert("TEXT".to_owned(), text.to_owned());
        variables.insert("COLOR".to_owned(), severity.css_color().to_owned());
        self.render(Template::TextView, &variables)
    }

    /// Markup for a centered image.
    pub fn image_view(&self, image_url: &str) -> Result<String, DisplayError> {
        let mut variables = HashMap::new();
        variables.insert("IMAGE".to_owned(), image_url.to_owned());
        self.render(Template::ImageView, &variables)
    }

    /// Pure substitution of `${NAME}` variables into `template`, from the
    /// per-call variables first and the ambient store second.
    pub fn render(
        &self,
        template: Template,
        variables: &HashMap<String, String>,
    ) -> Result<String, DisplayError> {
        let source = template.source();
        let mut output = String::with_capacity(source.len());
        let mut rest = source;

        while let Some(start) = rest.find("${") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find('}')
                .ok_or_else(|| DisplayError::UnresolvedVariable(after.to_owned()))?;
            let name = &after[..end];
            let value = variables
                .get(name)
                .or_else(|| self.base.get(name))
                .ok_or_else(|| DisplayError::UnresolvedVariable(name.to_owned()))?;
            output.push_str(value);
            rest = &after[end + 1..];
        }
        output.push_str(rest);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> TemplateEngine {
        TemplateEngine::new(&DisplayConfig::default())
    }

    #[test]
    fn text_view_substitutes_text_and_color() {
        let markup = engine().text_view("Hello Kiosk", Severity::Warn).unwrap();
        assert!(markup.contains("Hello Kiosk"));
        assert!(markup.contains("rgb(255,165,0)"));
        assert!(!markup.contains("${"));
    }

    #[test]
    fn image_view_substitutes_url() {
        let markup = engine()
            .image_view("https://example.org/logo.png")
            .unwrap();
        assert!(markup.contains("https://example.org/logo.png"));
        assert!(!markup.contains("${"));
    }

    #[test]
    fn ambient_variables_are_available() {
        let config = DisplayConfig {
            screen_width: 1280,
            screen_height: 720,
            ..DisplayConfig::default()
        };
        let markup = TemplateEngine::new(&config)
            .text_view("x", Severity::Plain)
            .unwrap();
        assert!(markup.contains("1280"));
        assert!(markup.contains("720"));
    }

    #[test]
    fn unresolved_variable_fails() {
        let variables = HashMap::new();
        let result = engine().render(Template::ImageView, &variables);
        assert!(matches!(result, Err(DisplayError::UnresolvedVariable(name)) if name == "IMAGE"));
    }

    #[test]
    fn per_call_variables_override_ambient_store() {
        let mut variables = HashMap::new();
        variables.insert("IMAGE".to_owned(), "a.png".to_owned());
        variables.insert("APP".to_owned(), "override".to_owned());
        let markup = engine().render(Template::ImageView, &variables).unwrap();
        assert!(markup.contains("override"));
    }

    #[test]
    fn template_names_parse() {
        assert_eq!("TEXT_VIEW".parse::<Template>().unwrap(), Template::TextView);
        assert_eq!("IMAGE_VIEW".parse::<Template>().unwrap(), Template::ImageView);
        assert!(matches!(
            "SLIDE_SHOW".parse::<Template>(),
            Err(DisplayError::UnknownTemplate(_))
        ));
    }
}
