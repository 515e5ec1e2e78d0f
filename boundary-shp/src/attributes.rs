//! Décodage des valeurs dBase (.dbf)

use std::fmt;

use dbase::{Date, FieldValue};
use serde::Serialize;

/// Valeur d'un attribut, sérialisée vers sa valeur JSON naturelle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

/// Plus grand entier représentable sans perte en f64
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl AttributeValue {
    /// Convertit une valeur dBase
    pub fn from_field(value: FieldValue) -> Self {
        match value {
            FieldValue::Character(Some(s)) | FieldValue::Memo(s) => Self::text(s),
            FieldValue::Numeric(Some(n)) => Self::number(n),
            FieldValue::Float(Some(n)) => Self::number(n as f64),
            FieldValue::Double(n) | FieldValue::Currency(n) => Self::Number(n),
            FieldValue::Integer(n) => Self::Integer(n as i64),
            FieldValue::Logical(Some(b)) => Self::Bool(b),
            FieldValue::Date(Some(d)) => Self::Text(iso_date(&d)),
            // ISO 8601 sans fuseau: le .dbf n'en stocke pas
            FieldValue::DateTime(dt) => {
                let time = dt.time();
                Self::Text(format!(
                    "{}T{:02}:{:02}:{:02}",
                    iso_date(&dt.date()),
                    time.hours(),
                    time.minutes(),
                    time.seconds()
                ))
            }
            FieldValue::Character(None)
            | FieldValue::Numeric(None)
            | FieldValue::Float(None)
            | FieldValue::Logical(None)
            | FieldValue::Date(None) => Self::Null,
        }
    }

    /// Texte dBase: espaces de remplissage supprimés, vide -> Null
    fn text(s: String) -> Self {
        let trimmed = s.trim_end();
        if trimmed.is_empty() {
            Self::Null
        } else if trimmed.len() == s.len() {
            Self::Text(s)
        } else {
            Self::Text(trimmed.to_string())
        }
    }

    /// Numérique dBase: entier si la valeur n'a pas de partie décimale
    fn number(n: f64) -> Self {
        if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
            Self::Integer(n as i64)
        } else {
            Self::Number(n)
        }
    }

    /// Clé de regroupement (None pour Null)
    pub fn as_key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            other => Some(other.to_string()),
        }
    }
}

fn iso_date(d: &Date) -> String {
    format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day())
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "None"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_trimmed() {
        assert_eq!(
            AttributeValue::from_field(FieldValue::Character(Some("A0A  ".into()))),
            AttributeValue::Text("A0A".into())
        );
        assert_eq!(
            AttributeValue::from_field(FieldValue::Character(Some("   ".into()))),
            AttributeValue::Null
        );
        assert_eq!(
            AttributeValue::from_field(FieldValue::Character(None)),
            AttributeValue::Null
        );
    }

    #[test]
    fn test_numeric_integer_detection() {
        assert_eq!(
            AttributeValue::from_field(FieldValue::Numeric(Some(35.0))),
            AttributeValue::Integer(35)
        );
        assert_eq!(
            AttributeValue::from_field(FieldValue::Numeric(Some(12.5))),
            AttributeValue::Number(12.5)
        );
        assert_eq!(
            AttributeValue::from_field(FieldValue::Integer(-4)),
            AttributeValue::Integer(-4)
        );
    }

    #[test]
    fn test_dates_iso() {
        assert_eq!(
            AttributeValue::from_field(FieldValue::Date(Some(Date::new(3, 7, 2021)))),
            AttributeValue::Text("2021-07-03".into())
        );

        let dt = dbase::DateTime::new(Date::new(3, 7, 2021), dbase::Time::new(9, 5, 30));
        assert_eq!(
            AttributeValue::from_field(FieldValue::DateTime(dt)),
            AttributeValue::Text("2021-07-03T09:05:30".into())
        );
    }

    #[test]
    fn test_json_serialization() {
        let values = vec![
            AttributeValue::Null,
            AttributeValue::Bool(true),
            AttributeValue::Integer(10),
            AttributeValue::Number(1.5),
            AttributeValue::Text("Ontario".into()),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[null,true,10,1.5,"Ontario"]"#);
    }

    #[test]
    fn test_as_key() {
        assert_eq!(AttributeValue::Null.as_key(), None);
        assert_eq!(AttributeValue::Integer(35).as_key(), Some("35".into()));
        assert_eq!(AttributeValue::Text("24".into()).as_key(), Some("24".into()));
    }
}
