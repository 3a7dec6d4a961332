use proc_macro2::TokenStream;
use quote::quote;
use serde_json::Value;

/// Primitive schema types and their fixed Rust representations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BasicType {
    Integer,
    Float,
    Boolean,
    /// A boolean that the API only ever sends as `true`
    True,
    String,
}

impl BasicType {
    pub const ALL: [BasicType; 5] = [
        BasicType::Integer,
        BasicType::Float,
        BasicType::Boolean,
        BasicType::True,
        BasicType::String,
    ];

    /// Look up a schema type name
    pub fn from_schema_name(name: &str) -> Option<Self> {
        match name {
            "Integer" | "Int" => Some(Self::Integer),
            "Float" | "Float number" => Some(Self::Float),
            "Boolean" => Some(Self::Boolean),
            "True" => Some(Self::True),
            "String" => Some(Self::String),
            _ => None,
        }
    }

    pub fn schema_name(self) -> &'static str {
        match self {
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Boolean => "Boolean",
            Self::True => "True",
            Self::String => "String",
        }
    }

    pub fn rust_type(self) -> TokenStream {
        match self {
            Self::Integer => quote! { i64 },
            Self::Float => quote! { f64 },
            Self::Boolean | Self::True => quote! { bool },
            Self::String => quote! { String },
        }
    }

    /// The JSON form of the Rust zero value
    pub fn zero_value(self) -> Value {
        match self {
            Self::Integer => Value::from(0i64),
            Self::Float => Value::from(0.0f64),
            Self::Boolean | Self::True => Value::Bool(false),
            Self::String => Value::String(String::new()),
        }
    }

    pub fn is_text(self) -> bool {
        matches!(self, Self::String)
    }
}

/// Check if a schema name is a primitive
pub fn is_basic(name: &str) -> bool {
    BasicType::from_schema_name(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for basic in BasicType::ALL {
            assert_eq!(BasicType::from_schema_name(basic.schema_name()), Some(basic));
        }
        assert_eq!(BasicType::from_schema_name("Message"), None);
    }

    #[test]
    fn test_integer_is_i64() {
        assert_eq!(BasicType::Integer.rust_type().to_string(), "i64");
        assert_eq!(BasicType::True.rust_type().to_string(), "bool");
    }
}
