//! Identifier - Possibly-qualified name of a database object
//!
//! Format: `[server.][database.][schema.]local_name`
//!
//! Examples:
//! - `users`
//! - `dbo.users`
//! - `sales.dbo.users`
//! - `[prod-01].sales.dbo.[order details]`

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A possibly-qualified name referring to a database object.
///
/// Parts are ordered from most to least qualifying: server, database, schema,
/// local name. A part may only be present when every less-qualifying part is
/// present, so a database name always comes with a schema name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    server: Option<String>,
    database: Option<String>,
    schema: Option<String>,
    local_name: String,
}

impl Identifier {
    /// Create an unqualified identifier
    pub fn new(local_name: impl Into<String>) -> Result<Self> {
        Self::build(None, None, None, local_name.into())
    }

    /// Create a schema-qualified identifier
    pub fn qualified(schema: impl Into<String>, local_name: impl Into<String>) -> Result<Self> {
        Self::build(None, None, Some(schema.into()), local_name.into())
    }

    /// Create a database-qualified identifier
    pub fn with_database(
        database: impl Into<String>,
        schema: impl Into<String>,
        local_name: impl Into<String>,
    ) -> Result<Self> {
        Self::build(None, Some(database.into()), Some(schema.into()), local_name.into())
    }

    /// Create a fully-qualified identifier
    pub fn with_server(
        server: impl Into<String>,
        database: impl Into<String>,
        schema: impl Into<String>,
        local_name: impl Into<String>,
    ) -> Result<Self> {
        Self::build(
            Some(server.into()),
            Some(database.into()),
            Some(schema.into()),
            local_name.into(),
        )
    }

    /// Create an identifier from optional parts
    pub fn from_parts(
        server: Option<&str>,
        database: Option<&str>,
        schema: Option<&str>,
        local_name: &str,
    ) -> Result<Self> {
        Self::build(
            server.map(str::to_string),
            database.map(str::to_string),
            schema.map(str::to_string),
            local_name.to_string(),
        )
    }

    fn build(
        server: Option<String>,
        database: Option<String>,
        schema: Option<String>,
        local_name: String,
    ) -> Result<Self> {
        for (label, part) in [
            ("server", server.as_deref()),
            ("database", database.as_deref()),
            ("schema", schema.as_deref()),
            ("local name", Some(local_name.as_str())),
        ] {
            if let Some(part) = part {
                if part.trim().is_empty() {
                    return Err(Error::InvalidIdentifier(format!("{} must not be empty", label)));
                }
            }
        }

        if server.is_some() && database.is_none() {
            return Err(Error::InvalidIdentifier(
                "a server name requires a database name".to_string(),
            ));
        }
        if database.is_some() && schema.is_none() {
            return Err(Error::InvalidIdentifier(
                "a database name requires a schema name".to_string(),
            ));
        }

        Ok(Self {
            server,
            database,
            schema,
            local_name,
        })
    }

    /// Server name, if qualified that far
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    /// Database name, if qualified that far
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Schema name, if qualified
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// The object's own name
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Present parts, most-qualifying first
    pub fn parts(&self) -> Vec<&str> {
        [
            self.server.as_deref(),
            self.database.as_deref(),
            self.schema.as_deref(),
            Some(self.local_name.as_str()),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Same object name placed in another schema (server and database are kept)
    pub fn in_schema(&self, schema: impl Into<String>) -> Result<Self> {
        Self::build(
            self.server.clone(),
            self.database.clone(),
            Some(schema.into()),
            self.local_name.clone(),
        )
    }

    /// Same local name with no qualification at all
    pub fn unqualified(&self) -> Self {
        Self {
            server: None,
            database: None,
            schema: None,
            local_name: self.local_name.clone(),
        }
    }

    /// Case-insensitive comparison of every part
    pub fn eq_ignore_case(&self, other: &Identifier) -> bool {
        fn part_eq(a: Option<&str>, b: Option<&str>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                (None, None) => true,
                _ => false,
            }
        }

        part_eq(self.server(), other.server())
            && part_eq(self.database(), other.database())
            && part_eq(self.schema(), other.schema())
            && self.local_name.eq_ignore_ascii_case(&other.local_name)
    }

    /// Parse a dotted name into an Identifier
    ///
    /// Parts may be quoted with `[...]`, `"..."` or `` `...` ``; a doubled closing
    /// quote inside a quoted part stands for the quote character itself.
    pub fn parse(name: &str) -> Result<Self> {
        let parts = split_parts(name)?;

        match parts.as_slice() {
            [local] => Self::build(None, None, None, local.clone()),
            [schema, local] => Self::build(None, None, Some(schema.clone()), local.clone()),
            [database, schema, local] => Self::build(
                None,
                Some(database.clone()),
                Some(schema.clone()),
                local.clone(),
            ),
            [server, database, schema, local] => Self::build(
                Some(server.clone()),
                Some(database.clone()),
                Some(schema.clone()),
                local.clone(),
            ),
            _ => Err(Error::InvalidIdentifier(format!(
                "expected 1 to 4 name parts, found {}: {}",
                parts.len(),
                name
            ))),
        }
    }
}

fn split_parts(name: &str) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = name.chars().peekable();
    let mut quoted_part = false;

    while let Some(ch) = chars.next() {
        let closing = match ch {
            '[' if current.is_empty() && !quoted_part => Some(']'),
            '"' if current.is_empty() && !quoted_part => Some('"'),
            '`' if current.is_empty() && !quoted_part => Some('`'),
            _ => None,
        };

        if let Some(closing) = closing {
            loop {
                match chars.next() {
                    Some(c) if c == closing => {
                        if chars.peek() == Some(&closing) {
                            chars.next();
                            current.push(closing);
                        } else {
                            break;
                        }
                    }
                    Some(c) => current.push(c),
                    None => {
                        return Err(Error::InvalidIdentifier(format!(
                            "unterminated quoted name: {}",
                            name
                        )));
                    }
                }
            }
            quoted_part = true;
            match chars.peek() {
                None | Some('.') => {}
                Some(_) => {
                    return Err(Error::InvalidIdentifier(format!(
                        "unexpected character after quoted name: {}",
                        name
                    )));
                }
            }
            continue;
        }

        if ch == '.' {
            if current.is_empty() {
                return Err(Error::InvalidIdentifier(format!("empty name part: {}", name)));
            }
            parts.push(std::mem::take(&mut current));
            quoted_part = false;
            continue;
        }

        current.push(ch);
    }

    if current.is_empty() {
        return Err(Error::InvalidIdentifier(format!("empty name part: {}", name)));
    }
    parts.push(current);

    Ok(parts)
}

fn needs_quoting(part: &str) -> bool {
    part.contains(['.', '[', ']', '"', '`']) || part.trim() != part
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts().into_iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            if needs_quoting(part) {
                write!(f, "[{}]", part.replace(']', "]]"))?;
            } else {
                f.write_str(part)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Identifier::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Default name parts a database applies to names that omit them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierDefaults {
    pub server: Option<String>,
    pub database: Option<String>,
    pub schema: Option<String>,
}

impl IdentifierDefaults {
    pub fn new(server: Option<String>, database: Option<String>, schema: Option<String>) -> Self {
        Self {
            server,
            database,
            schema,
        }
    }

    /// Defaults that only supply a schema
    pub fn with_schema(schema: impl Into<String>) -> Self {
        Self {
            server: None,
            database: None,
            schema: Some(schema.into()),
        }
    }

    /// Fill in every part missing from `identifier` that these defaults supply.
    ///
    /// Parts are filled from the schema outwards and stop at the first gap, so
    /// the result always satisfies the identifier qualification order.
    pub fn qualify(&self, identifier: &Identifier) -> Identifier {
        fn usable(part: &Option<String>) -> Option<String> {
            part.as_ref().filter(|p| !p.trim().is_empty()).cloned()
        }

        let schema = identifier.schema.clone().or_else(|| usable(&self.schema));
        let database = match schema {
            Some(_) => identifier.database.clone().or_else(|| usable(&self.database)),
            None => None,
        };
        let server = match database {
            Some(_) => identifier.server.clone().or_else(|| usable(&self.server)),
            None => None,
        };

        Identifier {
            server,
            database,
            schema,
            local_name: identifier.local_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_parts() {
        let id = Identifier::parse("srv.sales.dbo.users").unwrap();
        assert_eq!(id.server(), Some("srv"));
        assert_eq!(id.database(), Some("sales"));
        assert_eq!(id.schema(), Some("dbo"));
        assert_eq!(id.local_name(), "users");

        let id = Identifier::parse("users").unwrap();
        assert_eq!(id.schema(), None);
        assert_eq!(id.local_name(), "users");
    }

    #[test]
    fn test_parse_quoted() {
        let id = Identifier::parse("[my.db].\"dbo\".[order]]s]").unwrap();
        assert_eq!(id.database(), Some("my.db"));
        assert_eq!(id.schema(), Some("dbo"));
        assert_eq!(id.local_name(), "order]s");
        assert_eq!(id.to_string(), "[my.db].dbo.[order]]s]");
        assert_eq!(Identifier::parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(Identifier::new("").is_err());
        assert!(Identifier::new("   ").is_err());
        assert!(Identifier::qualified("", "users").is_err());
        assert!(Identifier::parse("a..b").is_err());
        assert!(Identifier::parse("a.b.c.d.e").is_err());
        assert!(Identifier::parse("[unterminated").is_err());
        assert!(Identifier::parse("[a]b").is_err());
        assert!(Identifier::from_parts(Some("srv"), None, Some("dbo"), "t").is_err());
        assert!(Identifier::from_parts(None, Some("db"), None, "t").is_err());
    }

    #[test]
    fn test_eq_ignore_case() {
        let a = Identifier::qualified("dbo", "Users").unwrap();
        let b = Identifier::qualified("DBO", "users").unwrap();
        assert_ne!(a, b);
        assert!(a.eq_ignore_case(&b));
        assert!(!a.eq_ignore_case(&Identifier::new("users").unwrap()));
    }

    #[test]
    fn test_qualify_with_defaults() {
        let defaults = IdentifierDefaults::new(
            Some("srv".to_string()),
            Some("sales".to_string()),
            Some("dbo".to_string()),
        );

        let id = defaults.qualify(&Identifier::new("users").unwrap());
        assert_eq!(id.to_string(), "srv.sales.dbo.users");

        let id = defaults.qualify(&Identifier::qualified("audit", "log").unwrap());
        assert_eq!(id.to_string(), "srv.sales.audit.log");
    }

    #[test]
    fn test_qualify_stops_at_gap() {
        let defaults = IdentifierDefaults::new(Some("srv".to_string()), None, Some("main".to_string()));
        let id = defaults.qualify(&Identifier::new("users").unwrap());
        assert_eq!(id.to_string(), "main.users");
        assert_eq!(id.server(), None);
    }

    #[test]
    fn test_serde_as_string() {
        let id = Identifier::qualified("dbo", "users").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"dbo.users\"");
        let back: Identifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
