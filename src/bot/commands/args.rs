//! Typed argument resolution for commands.
//!
//! Failures are recorded per argument instead of aborting the command, so a
//! body can tell "missing" from "malformed" and answer accordingly.

use thiserror::Error;

use crate::bot::chat_event::chat_event::{mention, Attachment, InteractionOption, MentionKind, Snowflake};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    String,
    Integer,
    Number,
    Boolean,
    User,
    Channel,
    Role,
    Attachment,
    /// Every remaining token.
    Rest,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    User(Snowflake),
    Channel(Snowflake),
    Role(Snowflake),
    Attachment(Attachment),
    Rest(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgSpec {
    pub name: String,
    pub kind: ArgKind,
    pub required: bool,
    pub default: Option<ArgValue>,
    pub description: String,
}

impl ArgSpec {
    pub fn new(name: impl Into<String>, kind: ArgKind) -> Self {
        ArgSpec { name: name.into(), kind, required: false, default: None, description: String::new() }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, value: ArgValue) -> Self {
        self.default = Some(value);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgError {
    #[error("missing required argument `{0}`")]
    Missing(String),
    #[error("argument `{name}` expects {expected:?}, got `{raw}`")]
    Invalid { name: String, expected: ArgKind, raw: String },
}

#[derive(Debug, Clone, Default)]
pub struct ArgResults {
    entries: Vec<(String, Result<ArgValue, ArgError>)>,
    raw: Vec<String>,
}

impl ArgResults {
    /// Resolved value for `name`; `None` when absent or failed.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.result(name).and_then(|r| r.as_ref().ok())
    }

    pub fn result(&self, name: &str) -> Option<&Result<ArgValue, ArgError>> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            ArgValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            ArgValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            ArgValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn user(&self, name: &str) -> Option<Snowflake> {
        match self.get(name)? {
            ArgValue::User(id) => Some(*id),
            _ => None,
        }
    }

    pub fn rest(&self, name: &str) -> Option<&[String]> {
        match self.get(name)? {
            ArgValue::Rest(tokens) => Some(tokens),
            _ => None,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &ArgError> {
        self.entries.iter().filter_map(|(_, r)| r.as_ref().err())
    }

    pub fn is_complete(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Tokens the command was invoked with, after prefix and name.
    pub fn raw(&self) -> &[String] {
        &self.raw
    }
}

/// Resolves positional tokens against `specs` in declaration order.
///
/// A token that fails to parse for an optional argument is left for the next
/// argument; for a required one it is consumed and reported as invalid.
/// Attachments come from the message itself, and a `<@id>` token only
/// resolves to a user the message actually mentions.
pub fn resolve_args(
    specs: &[ArgSpec],
    tokens: &[String],
    attachments: &[Attachment],
    mentions: &[Snowflake],
) -> ArgResults {
    let mut results = ArgResults { entries: Vec::new(), raw: tokens.to_vec() };
    let mut cursor = 0;
    let mut next_attachment = 0;

    for spec in specs {
        let found = match spec.kind {
            ArgKind::Attachment => attachments.get(next_attachment).map(|a| {
                next_attachment += 1;
                Ok(ArgValue::Attachment(a.clone()))
            }),
            ArgKind::Rest if cursor < tokens.len() => {
                let rest = tokens[cursor..].to_vec();
                cursor = tokens.len();
                Some(Ok(ArgValue::Rest(rest)))
            }
            ArgKind::Rest => None,
            kind => match tokens.get(cursor) {
                None => None,
                Some(raw) => match parse_value(kind, raw, Some(mentions)) {
                    Some(value) => {
                        cursor += 1;
                        Some(Ok(value))
                    }
                    None if spec.required => {
                        cursor += 1;
                        Some(Err(ArgError::Invalid { name: spec.name.clone(), expected: kind, raw: raw.clone() }))
                    }
                    None => None,
                },
            },
        };
        if let Some(outcome) = settle(spec, found) {
            results.entries.push((spec.name.clone(), outcome));
        }
    }

    results
}

/// Resolves named slash-command options against `specs`.
pub fn resolve_options(specs: &[ArgSpec], options: &[InteractionOption]) -> ArgResults {
    let mut results = ArgResults {
        entries: Vec::new(),
        raw: options.iter().map(|o| o.value.clone()).collect(),
    };

    for spec in specs {
        let found = options.iter().find(|o| o.name == spec.name).map(|option| {
            let value = match spec.kind {
                ArgKind::Rest => Some(ArgValue::Rest(option.value.split_whitespace().map(str::to_owned).collect())),
                kind => parse_value(kind, &option.value, None),
            };
            value.ok_or_else(|| ArgError::Invalid {
                name: spec.name.clone(),
                expected: spec.kind,
                raw: option.value.clone(),
            })
        });
        if let Some(outcome) = settle(spec, found) {
            results.entries.push((spec.name.clone(), outcome));
        }
    }

    results
}

fn settle(spec: &ArgSpec, found: Option<Result<ArgValue, ArgError>>) -> Option<Result<ArgValue, ArgError>> {
    match found {
        Some(outcome) => Some(outcome),
        None => match &spec.default {
            Some(default) => Some(Ok(default.clone())),
            None if spec.required => Some(Err(ArgError::Missing(spec.name.clone()))),
            None => None,
        },
    }
}

fn parse_value(kind: ArgKind, raw: &str, mentions: Option<&[Snowflake]>) -> Option<ArgValue> {
    match kind {
        ArgKind::String => Some(ArgValue::String(raw.to_owned())),
        ArgKind::Integer => raw.parse().ok().map(ArgValue::Integer),
        ArgKind::Number => raw.parse::<f64>().ok().filter(|n| n.is_finite()).map(ArgValue::Number),
        ArgKind::Boolean => match raw.to_lowercase().as_str() {
            "true" | "yes" | "y" | "on" | "1" => Some(ArgValue::Boolean(true)),
            "false" | "no" | "n" | "off" | "0" => Some(ArgValue::Boolean(false)),
            _ => None,
        },
        ArgKind::User => match mention(raw) {
            Some((MentionKind::User, id)) if mentions.map_or(true, |m| m.contains(&id)) => Some(ArgValue::User(id)),
            Some(_) => None,
            None => raw.parse().ok().map(ArgValue::User),
        },
        ArgKind::Channel => id_of(MentionKind::Channel, raw).map(ArgValue::Channel),
        ArgKind::Role => id_of(MentionKind::Role, raw).map(ArgValue::Role),
        ArgKind::Attachment | ArgKind::Rest => None,
    }
}

/// A mention of `kind`, or a bare id.
fn id_of(kind: MentionKind, raw: &str) -> Option<Snowflake> {
    match mention(raw) {
        Some((found, id)) if found == kind => Some(id),
        Some(_) => None,
        None => raw.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &str) -> Vec<String> {
        raw.split_whitespace().map(str::to_owned).collect()
    }

    #[test]
    fn resolves_in_declaration_order_with_rest() {
        let specs = vec![
            ArgSpec::new("target", ArgKind::User).required(),
            ArgSpec::new("days", ArgKind::Integer),
            ArgSpec::new("reason", ArgKind::Rest),
        ];
        let args = resolve_args(&specs, &tokens("<@!42> 7 being rude again"), &[], &[42]);

        assert_eq!(args.user("target"), Some(42));
        assert_eq!(args.integer("days"), Some(7));
        assert_eq!(args.rest("reason").map(|r| r.join(" ")), Some("being rude again".to_string()));
        assert!(args.is_complete());
    }

    #[test]
    fn missing_required_argument_is_a_value_not_a_failure() {
        let specs = vec![ArgSpec::new("target", ArgKind::User).required()];
        let args = resolve_args(&specs, &[], &[], &[]);

        assert_eq!(args.result("target"), Some(&Err(ArgError::Missing("target".into()))));
        assert!(!args.is_complete());
        assert_eq!(args.get("target"), None);
    }

    #[test]
    fn optional_argument_that_does_not_parse_leaves_the_token() {
        let specs = vec![ArgSpec::new("count", ArgKind::Integer), ArgSpec::new("word", ArgKind::String)];
        let args = resolve_args(&specs, &tokens("hello"), &[], &[]);

        assert_eq!(args.get("count"), None);
        assert!(args.result("count").is_none());
        assert_eq!(args.string("word"), Some("hello"));
    }

    #[test]
    fn required_argument_that_does_not_parse_is_invalid() {
        let specs = vec![ArgSpec::new("count", ArgKind::Integer).required()];
        let args = resolve_args(&specs, &tokens("many"), &[], &[]);

        assert_eq!(
            args.result("count"),
            Some(&Err(ArgError::Invalid { name: "count".into(), expected: ArgKind::Integer, raw: "many".into() }))
        );
    }

    #[test]
    fn defaults_fill_absent_arguments() {
        let specs = vec![ArgSpec::new("loud", ArgKind::Boolean).default(ArgValue::Boolean(false))];
        assert_eq!(resolve_args(&specs, &[], &[], &[]).boolean("loud"), Some(false));
        assert_eq!(resolve_args(&specs, &tokens("yes"), &[], &[]).boolean("loud"), Some(true));
    }

    #[test]
    fn attachments_come_from_the_message() {
        let file = Attachment { id: 1, filename: "cat.png".into(), url: "https://cdn/cat.png".into() };
        let specs = vec![ArgSpec::new("image", ArgKind::Attachment).required()];
        let args = resolve_args(&specs, &[], &[file.clone()], &[]);

        assert_eq!(args.get("image"), Some(&ArgValue::Attachment(file)));
    }

    #[test]
    fn channel_and_role_mentions_are_kind_specific() {
        let specs = vec![ArgSpec::new("channel", ArgKind::Channel), ArgSpec::new("role", ArgKind::Role)];
        let args = resolve_args(&specs, &tokens("<#10> <@&20>"), &[], &[]);

        assert_eq!(args.get("channel"), Some(&ArgValue::Channel(10)));
        assert_eq!(args.get("role"), Some(&ArgValue::Role(20)));

        let swapped = resolve_args(&specs, &tokens("<@&20>"), &[], &[]);
        assert_eq!(swapped.get("channel"), None);
        assert_eq!(swapped.get("role"), Some(&ArgValue::Role(20)));
    }

    #[test]
    fn user_mentions_must_be_real_mentions_of_the_message() {
        let specs = vec![ArgSpec::new("target", ArgKind::User).required()];

        let mentioned = resolve_args(&specs, &tokens("<@5>"), &[], &[5]);
        assert_eq!(mentioned.user("target"), Some(5));

        let typed = resolve_args(&specs, &tokens("<@5>"), &[], &[9]);
        assert!(matches!(typed.result("target"), Some(Err(ArgError::Invalid { .. }))));

        let bare_id = resolve_args(&specs, &tokens("5"), &[], &[]);
        assert_eq!(bare_id.user("target"), Some(5));
    }

    #[test]
    fn options_resolve_by_name() {
        let specs = vec![
            ArgSpec::new("amount", ArgKind::Number).required(),
            ArgSpec::new("note", ArgKind::String),
        ];
        let options = vec![
            InteractionOption { name: "note".into(), value: "lunch".into() },
            InteractionOption { name: "amount".into(), value: "12.5".into() },
        ];
        let args = resolve_options(&specs, &options);

        assert_eq!(args.get("amount"), Some(&ArgValue::Number(12.5)));
        assert_eq!(args.string("note"), Some("lunch"));
    }
}
