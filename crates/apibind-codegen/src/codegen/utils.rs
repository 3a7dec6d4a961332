use proc_macro2::TokenStream;
use quote::quote;

/// Sanitize a string to be safe for identifiers
pub(super) fn sanitize_name(s: &str) -> String {
    if s.is_empty() {
        return "unknown".to_string();
    }

    // Replace invalid characters with underscores
    let mut sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    // Ensure it doesn't start with a digit
    if sanitized.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        sanitized = format!("_{}", sanitized);
    }

    sanitized
}

/// Create an identifier, using raw identifier if necessary for keywords
pub(super) fn make_ident(s: &str) -> syn::Ident {
    if s.is_empty() {
        tracing::warn!("empty identifier encountered, using 'unknown' as fallback");
        return syn::Ident::new("unknown", proc_macro2::Span::call_site());
    }

    let sanitized = sanitize_name(s);

    // Try to parse as ident, fall back to raw ident if needed
    syn::parse_str::<syn::Ident>(&sanitized).unwrap_or_else(|_| {
        // keywords that survive sanitization get 'r#'
        if s != sanitized {
            tracing::warn!("invalid identifier '{}' sanitized to '{}'", s, sanitized);
            syn::Ident::new(&sanitized, proc_macro2::Span::call_site())
        } else {
            syn::Ident::new_raw(&sanitized, proc_macro2::Span::call_site())
        }
    })
}

/// Generate doc comment from optional description
pub(super) fn generate_doc_comment(desc: Option<&str>) -> TokenStream {
    if let Some(description) = desc {
        quote! {
            #[doc = #description]
        }
    } else {
        quote! {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_ident() {
        assert_eq!(make_ident("chat_id").to_string(), "chat_id");
        assert_eq!(make_ident("type").to_string(), "r#type");
        assert_eq!(make_ident("9lives").to_string(), "_9lives");
        assert_eq!(make_ident("a-b").to_string(), "a_b");
    }
}
