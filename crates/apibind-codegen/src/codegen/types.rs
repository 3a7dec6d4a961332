use crate::decode::ShadowKind;
use crate::registry::{FieldType, ResolvedField};
use proc_macro2::TokenStream;
use quote::quote;

use super::CodeGenerator;
use super::utils::make_ident;

impl<'r> CodeGenerator<'r> {
    /// Rust type for a resolved field type, without array or option wrapping
    pub(super) fn base_type(&self, ty: &FieldType) -> TokenStream {
        match ty {
            FieldType::Basic(basic) => basic.rust_type(),
            FieldType::Struct(key) | FieldType::Union(key) => {
                let ident = self.type_ident(key);
                quote! { #ident }
            }
            FieldType::Special(name) => match self
                .overrides
                .special(name)
                .and_then(|s| syn::parse_str::<syn::Path>(&s.rust_path).ok())
            {
                Some(path) => quote! { #path },
                None => {
                    tracing::warn!(special = %name, "special type has no usable path");
                    quote! { serde_json::Value }
                }
            },
            // Hand-written at the crate root
            FieldType::Skipped(name) => {
                let ident = make_ident(name);
                quote! { crate::#ident }
            }
            FieldType::Dynamic => quote! { serde_json::Value },
            FieldType::Unresolved(name) => {
                let ident = placeholder_ident(name);
                quote! { #ident }
            }
        }
    }

    /// Rust type of a field as declared in its struct
    ///
    /// Union fields are never required: a payload whose shape matches no
    /// option leaves them empty.
    pub(super) fn field_type(&self, field: &ResolvedField) -> TokenStream {
        let mut ty = self.base_type(&field.ty);
        if field.is_boxed() {
            ty = quote! { Box<#ty> };
        }
        for _ in 0..field.array_depth {
            ty = quote! { Vec<#ty> };
        }

        let optional = if field.is_union() {
            field.array_depth == 0
        } else {
            !field.required
        };
        if optional {
            quote! { std::option::Option<#ty> }
        } else {
            ty
        }
    }

    /// Rust type of a field inside a shadow or raw struct
    pub(super) fn shadow_type(&self, kind: &ShadowKind) -> TokenStream {
        match kind {
            ShadowKind::Typed {
                ty,
                array_depth,
                boxed,
            } => {
                let mut inner = self.base_type(ty);
                if *boxed && *array_depth == 0 {
                    inner = quote! { Box<#inner> };
                }
                for _ in 0..*array_depth {
                    inner = quote! { Vec<#inner> };
                }
                quote! { std::option::Option<#inner> }
            }
            ShadowKind::Raw => quote! { std::option::Option<serde_json::Value> },
            ShadowKind::Union { union, array_depth } => {
                let shadow = self.shadow_ident(union);
                if *array_depth == 0 {
                    return quote! { std::option::Option<Box<#shadow>> };
                }
                let mut inner = quote! { std::option::Option<#shadow> };
                for _ in 1..*array_depth {
                    inner = quote! { std::option::Option<Vec<#inner>> };
                }
                quote! { std::option::Option<Vec<#inner>> }
            }
        }
    }
}

pub(super) fn placeholder_ident(name: &str) -> syn::Ident {
    make_ident(&format!("Unresolved{}", name))
}
