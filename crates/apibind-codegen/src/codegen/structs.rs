use crate::registry::{ResolvedField, StructDescriptor};
use proc_macro2::TokenStream;
use quote::quote;

use super::CodeGenerator;
use super::names::field_ident;
use super::utils::generate_doc_comment;

impl<'r> CodeGenerator<'r> {
    /// Generate a record struct
    ///
    /// Structs holding union fields get their `Deserialize` impl from the
    /// decode module instead of the derive.
    pub(super) fn generate_struct(&self, descriptor: &StructDescriptor) -> TokenStream {
        let ident = self.type_ident(&descriptor.key);
        let doc = generate_doc_comment(descriptor.description.as_deref());
        let fields: Vec<_> = descriptor
            .fields
            .iter()
            .map(|f| self.generate_field(f))
            .collect();

        let derive = if descriptor.has_union_fields() {
            quote! { #[derive(serde::Serialize, Debug, Clone, PartialEq, Default)] }
        } else {
            quote! { #[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Default)] }
        };

        quote! {
            #doc
            #derive
            pub struct #ident {
                #(#fields)*
            }
        }
    }

    fn generate_field(&self, field: &ResolvedField) -> TokenStream {
        let (ident, rename) = field_ident(&field.name);
        let rust_type = self.field_type(field);
        let doc = generate_doc_comment(field.description.as_deref());

        let mut attrs = Vec::new();
        if let Some(rename) = rename {
            attrs.push(quote! { #[serde(rename = #rename)] });
        }
        if field.is_union() && field.array_depth > 0 {
            attrs.push(quote! { #[serde(skip_serializing_if = "Vec::is_empty")] });
        } else if field.is_union() || !field.required {
            attrs.push(quote! { #[serde(skip_serializing_if = "std::option::Option::is_none")] });
        }

        quote! {
            #doc
            #(#attrs)*
            pub #ident: #rust_type,
        }
    }

    /// Fields of a raw struct: the host's own fields, with union fields
    /// replaced by the shadow of their union
    pub(super) fn generate_raw_fields(&self, descriptor: &StructDescriptor) -> Vec<TokenStream> {
        descriptor
            .fields
            .iter()
            .map(|field| {
                let (ident, rename) = field_ident(&field.name);
                let rename = rename.map(|r| quote! { #[serde(rename = #r)] });
                let rust_type = match field.union_key() {
                    Some(union) => self.shadow_type(&crate::decode::ShadowKind::Union {
                        union: union.clone(),
                        array_depth: field.array_depth,
                    }),
                    None => self.field_type(field),
                };
                quote! {
                    #rename
                    #ident: #rust_type,
                }
            })
            .collect()
    }
}
