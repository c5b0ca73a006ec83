//! Path template compilation.
//!
//! Turns `/tasks/:id/complete` into the anchored matcher
//! `^/tasks/([^/]+)/complete$` plus the ordered parameter names `["id"]`.
//!
//! # Design Decisions
//! - A segment is a parameter only when it starts with `:`; the rest of the
//!   segment is the parameter name
//! - Literal segments are regex-escaped, so `.` or `+` in a template match
//!   themselves
//! - Capture group `i` always corresponds to `param_names[i]`

use regex::Regex;

use crate::routing::RouteError;

const PARAM_SIGIL: char = ':';
const PARAM_CAPTURE: &str = "([^/]+)";

/// A compiled path template.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    source: String,
    matcher: Regex,
    param_names: Vec<String>,
}

impl PathTemplate {
    /// Compile a path template.
    pub fn compile(template: &str) -> Result<Self, RouteError> {
        if !template.starts_with('/') {
            return Err(RouteError::InvalidTemplate(template.to_string()));
        }

        let mut pattern = String::with_capacity(template.len() + 8);
        let mut param_names: Vec<String> = Vec::new();

        pattern.push('^');
        for (index, segment) in template.split('/').enumerate() {
            if index > 0 {
                pattern.push('/');
            }

            match segment.strip_prefix(PARAM_SIGIL) {
                Some("") => {
                    return Err(RouteError::EmptyParamName(template.to_string()));
                }
                Some(name) => {
                    if param_names.iter().any(|existing| existing == name) {
                        return Err(RouteError::DuplicateParam {
                            template: template.to_string(),
                            name: name.to_string(),
                        });
                    }
                    pattern.push_str(PARAM_CAPTURE);
                    param_names.push(name.to_string());
                }
                None => pattern.push_str(&regex::escape(segment)),
            }
        }
        pattern.push('$');

        let matcher = Regex::new(&pattern)?;
        debug_assert_eq!(matcher.captures_len() - 1, param_names.len());

        Ok(Self {
            source: template.to_string(),
            matcher,
            param_names,
        })
    }

    /// The template text this matcher was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn pattern(&self) -> &str {
        self.matcher.as_str()
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Match a whole path, binding captures to parameter names by position.
    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let captures = self.matcher.captures(path)?;
        let bound = self
            .param_names
            .iter()
            .enumerate()
            .filter_map(|(index, name)| {
                captures
                    .get(index + 1)
                    .map(|value| (name.clone(), value.as_str().to_string()))
            })
            .collect();
        Some(bound)
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.matcher.is_match(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_template() {
        let template = PathTemplate::compile("/").unwrap();
        assert_eq!(template.pattern(), "^/$");
        assert!(template.is_match("/"));
        assert!(!template.is_match("/tasks"));
        assert!(template.param_names().is_empty());
    }

    #[test]
    fn test_literal_template() {
        let template = PathTemplate::compile("/import/csv").unwrap();
        assert!(template.is_match("/import/csv"));
        assert!(!template.is_match("/import/csv/"));
        assert!(!template.is_match("/import"));
    }

    #[test]
    fn test_param_extraction() {
        let template = PathTemplate::compile("/tasks/:id/complete").unwrap();
        assert_eq!(template.pattern(), "^/tasks/([^/]+)/complete$");
        assert_eq!(template.param_names(), ["id".to_string()]);

        let bound = template.captures("/tasks/42/complete").unwrap();
        assert_eq!(bound, vec![("id".to_string(), "42".to_string())]);
    }

    #[test]
    fn test_params_bind_in_order() {
        let template = PathTemplate::compile("/users/:user/tasks/:task").unwrap();
        let bound = template.captures("/users/ana/tasks/7").unwrap();
        assert_eq!(
            bound,
            vec![
                ("user".to_string(), "ana".to_string()),
                ("task".to_string(), "7".to_string()),
            ]
        );
    }

    #[test]
    fn test_param_does_not_cross_separator() {
        let template = PathTemplate::compile("/tasks/:id").unwrap();
        assert!(template.captures("/tasks/1/2").is_none());
        assert!(template.captures("/tasks/").is_none());
    }

    #[test]
    fn test_literals_are_escaped() {
        let template = PathTemplate::compile("/files/report.csv").unwrap();
        assert!(template.is_match("/files/report.csv"));
        assert!(!template.is_match("/files/reportXcsv"));
    }

    #[test]
    fn test_invalid_templates() {
        assert!(matches!(
            PathTemplate::compile("tasks"),
            Err(RouteError::InvalidTemplate(_))
        ));
        assert!(matches!(
            PathTemplate::compile("/tasks/:"),
            Err(RouteError::EmptyParamName(_))
        ));
        assert!(matches!(
            PathTemplate::compile("/a/:id/b/:id"),
            Err(RouteError::DuplicateParam { .. })
        ));
    }
}
