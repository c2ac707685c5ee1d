//! HTML templates
use minijinja::Environment;
use serde::Serialize;

use crate::errors::TrawlTrackerError;

pub const INDEX_TEMPLATE: &str = "index.html";
pub const ENTRY_TEMPLATE: &str = "entry.html";

/// Template environment.
///
/// Templates are compiled into the binary. Names ending in `.html` are
/// rendered with HTML auto-escaping of every interpolated value.
#[derive(Debug)]
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, TrawlTrackerError> {
        let mut env = Environment::new();
        env.add_template(INDEX_TEMPLATE, include_str!("../templates/index.html"))?;
        env.add_template(ENTRY_TEMPLATE, include_str!("../templates/entry.html"))?;
        Ok(Self { env })
    }

    /// Render a named template with the given values
    pub fn render<S: Serialize>(
        &self,
        name: &str,
        values: S,
    ) -> Result<String, TrawlTrackerError> {
        let template = self.env.get_template(name)?;
        Ok(template.render(values)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn escapes_report_values() {
        let templates = Templates::new().unwrap();
        let html = templates
            .render(
                INDEX_TEMPLATE,
                context! {
                    reports => vec![context! {
                        comment => "<script>alert(1)</script>",
                        vessel_id => "V1",
                    }],
                },
            )
            .unwrap();

        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("V1"));
    }

    #[test]
    fn renders_entry_form() {
        let templates = Templates::new().unwrap();
        let html = templates.render(ENTRY_TEMPLATE, context! {}).unwrap();
        assert!(html.contains("action=\"/submit\""));
    }
}
