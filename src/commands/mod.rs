//! Slash-command registry and argument validation.
//!
//! Commands arrive over the wire as a keyword plus a raw argument string.
//! Each command declares an ordered [`ArgSpec`] list; the registry checks
//! structural rules at registration time (required arguments never follow
//! optional ones, a remainder argument is last) so a malformed declaration
//! is a startup failure, not a runtime surprise. Token validation happens
//! per invocation and reports a usage message back to the invoking user.

mod builtin;

pub use builtin::{execute, CommandKind};

use std::collections::HashMap;
use thiserror::Error;

/// Declared type of one command argument.
#[derive(Debug, Clone)]
pub enum ArgType {
    /// Accepts on/off, yes/no, true/false, y/n (case-insensitive).
    Bool,
    /// Signed integer with optional bounds.
    Int {
        /// Inclusive lower bound.
        min: Option<i64>,
        /// Inclusive upper bound.
        max: Option<i64>,
    },
    /// Float with optional bounds.
    Float {
        /// Inclusive lower bound.
        min: Option<f64>,
        /// Inclusive upper bound.
        max: Option<f64>,
    },
    /// One token out of a fixed option set.
    Choice(&'static [&'static str]),
    /// One free-form token.
    Str,
    /// Everything left on the line, joined with single spaces. Must be the
    /// last declared argument.
    Remainder,
}

/// A validated argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// Parsed boolean.
    Bool(bool),
    /// Parsed integer.
    Int(i64),
    /// Parsed float.
    Float(f64),
    /// Token, choice or remainder text.
    Str(String),
}

/// Declaration of one positional argument.
#[derive(Debug, Clone)]
pub struct ArgSpec {
    /// Argument name, used in usage strings and lookups.
    pub name: &'static str,
    /// Declared type.
    pub ty: ArgType,
    /// Whether the invocation must supply this argument.
    pub required: bool,
    /// Value substituted when an optional argument is not supplied.
    pub default: Option<ArgValue>,
}

impl ArgSpec {
    /// A required argument.
    pub fn required(name: &'static str, ty: ArgType) -> Self {
        Self {
            name,
            ty,
            required: true,
            default: None,
        }
    }

    /// An optional argument with no default.
    pub fn optional(name: &'static str, ty: ArgType) -> Self {
        Self {
            name,
            ty,
            required: false,
            default: None,
        }
    }

    /// An optional argument with a default value.
    pub fn optional_or(name: &'static str, ty: ArgType, default: ArgValue) -> Self {
        Self {
            name,
            ty,
            required: false,
            default: Some(default),
        }
    }
}

/// Validated arguments for one invocation, keyed by argument name.
#[derive(Debug, Default, PartialEq)]
pub struct Args(HashMap<&'static str, ArgValue>);

impl Args {
    /// The named argument, if supplied.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.get(name)
    }

    /// The named argument as a string slice.
    pub fn str(&self, name: &str) -> Option<&str> {
        match self.0.get(name) {
            Some(ArgValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// The named argument as a bool.
    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.0.get(name) {
            Some(ArgValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// The named argument as an integer.
    pub fn int(&self, name: &str) -> Option<i64> {
        match self.0.get(name) {
            Some(ArgValue::Int(i)) => Some(*i),
            _ => None,
        }
    }
}

/// A command declaration rejected at registration time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Keyword already registered.
    #[error("duplicate command keyword: {0}")]
    DuplicateKeyword(&'static str),

    /// Alias collides with an existing keyword or alias.
    #[error("duplicate command alias: {0}")]
    DuplicateAlias(&'static str),

    /// A required argument declared after an optional one.
    #[error("command {command}: required argument {arg} follows an optional argument")]
    RequiredAfterOptional {
        /// Offending command keyword.
        command: &'static str,
        /// Offending argument name.
        arg: &'static str,
    },

    /// A remainder argument declared before the end of the list.
    #[error("command {command}: remainder argument {arg} must be last")]
    RemainderNotLast {
        /// Offending command keyword.
        command: &'static str,
        /// Offending argument name.
        arg: &'static str,
    },
}

/// An invocation rejected during token validation.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Too few tokens for the required arguments.
    #[error("missing argument <{0}>")]
    MissingArgument(&'static str),

    /// More tokens than declared arguments.
    #[error("unexpected extra arguments")]
    TooManyArguments,

    /// Token is not a recognised boolean.
    #[error("argument <{arg}>: {token:?} is not a boolean (expected on/off, yes/no, true/false)")]
    InvalidBool {
        /// Argument name.
        arg: &'static str,
        /// Offending token.
        token: String,
    },

    /// Token does not parse as the declared numeric type.
    #[error("argument <{arg}>: {token:?} is not a valid {expected}")]
    InvalidNumber {
        /// Argument name.
        arg: &'static str,
        /// Offending token.
        token: String,
        /// "integer" or "number".
        expected: &'static str,
    },

    /// Numeric token outside the declared bounds.
    #[error("argument <{arg}>: {token} is out of range")]
    OutOfRange {
        /// Argument name.
        arg: &'static str,
        /// Offending token.
        token: String,
    },

    /// Token is not one of the declared choices.
    #[error("argument <{arg}>: {token:?} is not one of {options:?}")]
    InvalidChoice {
        /// Argument name.
        arg: &'static str,
        /// Offending token.
        token: String,
        /// Accepted options.
        options: &'static [&'static str],
    },
}

/// Declaration of one command: keyword, aliases, arguments, help text.
#[derive(Debug, Clone)]
pub struct CommandDescriptor {
    /// Primary keyword.
    pub keyword: &'static str,
    /// Alternate keywords resolving to this command.
    pub aliases: &'static [&'static str],
    /// Ordered positional arguments.
    pub args: Vec<ArgSpec>,
    /// Dispatch kind.
    pub kind: CommandKind,
    /// One-line description shown by `help`.
    pub help: &'static str,
}

impl CommandDescriptor {
    /// One-line usage string, e.g. `message <target> <content...>`.
    pub fn usage(&self) -> String {
        let mut out = self.keyword.to_string();
        for spec in &self.args {
            let tail = matches!(spec.ty, ArgType::Remainder);
            let inner = if tail {
                format!("{}...", spec.name)
            } else {
                spec.name.to_string()
            };
            if spec.required {
                out.push_str(&format!(" <{inner}>"));
            } else {
                out.push_str(&format!(" [{inner}]"));
            }
        }
        out
    }

    fn check_structure(&self) -> Result<(), RegistryError> {
        let mut seen_optional = false;
        for (i, spec) in self.args.iter().enumerate() {
            if matches!(spec.ty, ArgType::Remainder) && i + 1 != self.args.len() {
                return Err(RegistryError::RemainderNotLast {
                    command: self.keyword,
                    arg: spec.name,
                });
            }
            if spec.required && seen_optional {
                return Err(RegistryError::RequiredAfterOptional {
                    command: self.keyword,
                    arg: spec.name,
                });
            }
            if !spec.required {
                seen_optional = true;
            }
        }
        Ok(())
    }

    /// Validate raw whitespace-split tokens against the declared arguments.
    pub fn validate(&self, tokens: &[&str]) -> Result<Args, ValidationError> {
        let mut out = HashMap::new();
        let mut pos = 0;

        for spec in &self.args {
            if matches!(spec.ty, ArgType::Remainder) {
                let rest = &tokens[pos.min(tokens.len())..];
                if rest.is_empty() {
                    if spec.required {
                        return Err(ValidationError::MissingArgument(spec.name));
                    }
                    if let Some(default) = &spec.default {
                        out.insert(spec.name, default.clone());
                    }
                    break;
                }
                out.insert(spec.name, ArgValue::Str(rest.join(" ")));
                pos = tokens.len();
                break;
            }

            let Some(&token) = tokens.get(pos) else {
                if spec.required {
                    return Err(ValidationError::MissingArgument(spec.name));
                }
                if let Some(default) = &spec.default {
                    out.insert(spec.name, default.clone());
                }
                continue;
            };
            out.insert(spec.name, parse_token(spec, token)?);
            pos += 1;
        }

        if pos < tokens.len() {
            return Err(ValidationError::TooManyArguments);
        }
        Ok(Args(out))
    }
}

fn parse_token(spec: &ArgSpec, token: &str) -> Result<ArgValue, ValidationError> {
    match &spec.ty {
        ArgType::Bool => match token.to_lowercase().as_str() {
            "on" | "yes" | "true" | "y" => Ok(ArgValue::Bool(true)),
            "off" | "no" | "false" | "n" => Ok(ArgValue::Bool(false)),
            _ => Err(ValidationError::InvalidBool {
                arg: spec.name,
                token: token.to_string(),
            }),
        },
        ArgType::Int { min, max } => {
            let value: i64 = token.parse().map_err(|_| ValidationError::InvalidNumber {
                arg: spec.name,
                token: token.to_string(),
                expected: "integer",
            })?;
            if min.is_some_and(|m| value < m) || max.is_some_and(|m| value > m) {
                return Err(ValidationError::OutOfRange {
                    arg: spec.name,
                    token: token.to_string(),
                });
            }
            Ok(ArgValue::Int(value))
        }
        ArgType::Float { min, max } => {
            let value: f64 = token.parse().map_err(|_| ValidationError::InvalidNumber {
                arg: spec.name,
                token: token.to_string(),
                expected: "number",
            })?;
            if min.is_some_and(|m| value < m) || max.is_some_and(|m| value > m) {
                return Err(ValidationError::OutOfRange {
                    arg: spec.name,
                    token: token.to_string(),
                });
            }
            Ok(ArgValue::Float(value))
        }
        ArgType::Choice(options) => {
            let lower = token.to_lowercase();
            if options.contains(&lower.as_str()) {
                Ok(ArgValue::Str(lower))
            } else {
                Err(ValidationError::InvalidChoice {
                    arg: spec.name,
                    token: token.to_string(),
                    options,
                })
            }
        }
        ArgType::Str => Ok(ArgValue::Str(token.to_string())),
        ArgType::Remainder => unreachable!("remainder handled by the caller"),
    }
}

/// Keyword and alias lookup table for registered commands.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<&'static str, CommandDescriptor>,
    aliases: HashMap<&'static str, &'static str>,
}

impl CommandRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry preloaded with the built-in command set.
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for descriptor in builtin::descriptors() {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Register a command, checking keyword uniqueness and argument
    /// structure.
    pub fn register(&mut self, descriptor: CommandDescriptor) -> Result<(), RegistryError> {
        descriptor.check_structure()?;
        if self.commands.contains_key(descriptor.keyword)
            || self.aliases.contains_key(descriptor.keyword)
        {
            return Err(RegistryError::DuplicateKeyword(descriptor.keyword));
        }
        for &alias in descriptor.aliases {
            if self.commands.contains_key(alias) || self.aliases.contains_key(alias) {
                return Err(RegistryError::DuplicateAlias(alias));
            }
        }
        for &alias in descriptor.aliases {
            self.aliases.insert(alias, descriptor.keyword);
        }
        self.commands.insert(descriptor.keyword, descriptor);
        Ok(())
    }

    /// Resolve a keyword or alias to its command, case-insensitively.
    pub fn resolve(&self, keyword: &str) -> Option<&CommandDescriptor> {
        let lower = keyword.to_lowercase();
        let canonical = self
            .aliases
            .get(lower.as_str())
            .copied()
            .unwrap_or(lower.as_str());
        self.commands.get(canonical)
    }

    /// All registered commands, sorted by keyword.
    pub fn all(&self) -> Vec<&CommandDescriptor> {
        let mut list: Vec<_> = self.commands.values().collect();
        list.sort_by_key(|d| d.keyword);
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toggle_command() -> CommandDescriptor {
        CommandDescriptor {
            keyword: "volume",
            aliases: &["vol"],
            args: vec![ArgSpec::required(
                "level",
                ArgType::Int {
                    min: Some(0),
                    max: Some(10),
                },
            )],
            kind: CommandKind::DebugMode,
            help: "set the volume",
        }
    }

    #[test]
    fn test_resolve_by_alias_and_case() {
        let mut registry = CommandRegistry::new();
        registry.register(toggle_command()).unwrap();

        assert!(registry.resolve("volume").is_some());
        assert!(registry.resolve("VOL").is_some());
        assert!(registry.resolve("loudness").is_none());
    }

    #[test]
    fn test_duplicate_keyword_rejected() {
        let mut registry = CommandRegistry::new();
        registry.register(toggle_command()).unwrap();
        assert_eq!(
            registry.register(toggle_command()),
            Err(RegistryError::DuplicateKeyword("volume"))
        );
    }

    #[test]
    fn test_required_after_optional_rejected() {
        let descriptor = CommandDescriptor {
            keyword: "bad",
            aliases: &[],
            args: vec![
                ArgSpec::optional("first", ArgType::Str),
                ArgSpec::required("second", ArgType::Str),
            ],
            kind: CommandKind::Help,
            help: "",
        };
        let mut registry = CommandRegistry::new();
        assert!(matches!(
            registry.register(descriptor),
            Err(RegistryError::RequiredAfterOptional { arg: "second", .. })
        ));
    }

    #[test]
    fn test_remainder_must_be_last() {
        let descriptor = CommandDescriptor {
            keyword: "bad",
            aliases: &[],
            args: vec![
                ArgSpec::required("text", ArgType::Remainder),
                ArgSpec::optional("extra", ArgType::Str),
            ],
            kind: CommandKind::Help,
            help: "",
        };
        let mut registry = CommandRegistry::new();
        assert!(matches!(
            registry.register(descriptor),
            Err(RegistryError::RemainderNotLast { arg: "text", .. })
        ));
    }

    #[test]
    fn test_bool_tokens() {
        let spec = ArgSpec::required("flag", ArgType::Bool);
        for token in ["on", "YES", "true", "y"] {
            assert_eq!(parse_token(&spec, token), Ok(ArgValue::Bool(true)));
        }
        for token in ["off", "no", "FALSE", "n"] {
            assert_eq!(parse_token(&spec, token), Ok(ArgValue::Bool(false)));
        }
        assert!(matches!(
            parse_token(&spec, "maybe"),
            Err(ValidationError::InvalidBool { .. })
        ));
    }

    #[test]
    fn test_int_bounds() {
        let descriptor = toggle_command();
        assert_eq!(descriptor.validate(&["7"]).unwrap().int("level"), Some(7));
        assert!(matches!(
            descriptor.validate(&["11"]),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            descriptor.validate(&["loud"]),
            Err(ValidationError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_remainder_joins_rest() {
        let descriptor = CommandDescriptor {
            keyword: "say",
            aliases: &[],
            args: vec![
                ArgSpec::required("target", ArgType::Str),
                ArgSpec::required("text", ArgType::Remainder),
            ],
            kind: CommandKind::Message,
            help: "",
        };
        let args = descriptor.validate(&["alice", "hello", "there"]).unwrap();
        assert_eq!(args.str("target"), Some("alice"));
        assert_eq!(args.str("text"), Some("hello there"));

        assert_eq!(
            descriptor.validate(&["alice"]),
            Err(ValidationError::MissingArgument("text"))
        );
    }

    #[test]
    fn test_missing_and_extra_arguments() {
        let descriptor = toggle_command();
        assert_eq!(
            descriptor.validate(&[]),
            Err(ValidationError::MissingArgument("level"))
        );
        assert_eq!(
            descriptor.validate(&["3", "4"]),
            Err(ValidationError::TooManyArguments)
        );
    }

    #[test]
    fn test_optional_argument_may_be_absent() {
        let descriptor = CommandDescriptor {
            keyword: "mode",
            aliases: &[],
            args: vec![ArgSpec::optional(
                "state",
                ArgType::Choice(&["on", "off", "toggle"]),
            )],
            kind: CommandKind::DebugMode,
            help: "",
        };
        let args = descriptor.validate(&[]).unwrap();
        assert!(args.get("state").is_none());

        let args = descriptor.validate(&["ON"]).unwrap();
        assert_eq!(args.str("state"), Some("on"));

        assert!(matches!(
            descriptor.validate(&["sideways"]),
            Err(ValidationError::InvalidChoice { .. })
        ));
    }

    #[test]
    fn test_optional_default_substituted() {
        let descriptor = CommandDescriptor {
            keyword: "mode",
            aliases: &[],
            args: vec![ArgSpec::optional_or(
                "state",
                ArgType::Choice(&["on", "off", "toggle"]),
                ArgValue::Str("toggle".to_string()),
            )],
            kind: CommandKind::DebugMode,
            help: "",
        };
        let args = descriptor.validate(&[]).unwrap();
        assert_eq!(args.str("state"), Some("toggle"));

        // An explicit token wins over the default.
        let args = descriptor.validate(&["off"]).unwrap();
        assert_eq!(args.str("state"), Some("off"));
    }

    #[test]
    fn test_usage_string() {
        let descriptor = CommandDescriptor {
            keyword: "say",
            aliases: &[],
            args: vec![
                ArgSpec::required("target", ArgType::Str),
                ArgSpec::optional("text", ArgType::Remainder),
            ],
            kind: CommandKind::Message,
            help: "",
        };
        assert_eq!(descriptor.usage(), "say <target> [text...]");
    }

    #[test]
    fn test_builtin_set_registers() {
        let registry = CommandRegistry::builtin().expect("builtin commands");
        assert!(registry.resolve("help").is_some());
        assert!(registry.resolve("msg").is_some());
        assert!(registry.resolve("debugmode").is_some());
    }
}
