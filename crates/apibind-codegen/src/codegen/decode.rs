use crate::decode::{OptionPlan, ShadowKind, Strategy, UnionPlan};
use crate::error::{CodegenError, Result};
use crate::registry::{ResolvedField, StructDescriptor};
use proc_macro2::TokenStream;
use quote::quote;

use super::CodeGenerator;
use super::names::{field_ident, variant_names};
use super::utils::make_ident;

impl<'r> CodeGenerator<'r> {
    /// Joined shadow struct, decode function and `Deserialize` impl of a union
    pub(super) fn generate_union_decoder(&self, plan: &UnionPlan) -> Result<TokenStream> {
        let shadow_ident = self.shadow_ident(&plan.key);
        let enum_ident = make_ident(&plan.name);
        let decode_fn = self.decode_fn_ident(&plan.key);

        let shadow_fields = plan.shadow.iter().map(|field| {
            let (ident, rename) = field_ident(&field.name);
            let rename = rename.map(|r| quote! { #[serde(rename = #r)] });
            let ty = self.shadow_type(&field.kind);
            quote! {
                #rename
                #[serde(default)]
                #ident: #ty,
            }
        });

        let body = self.generate_decode_body(plan)?;
        let no_match = format!("payload matches no option of {}", plan.name);

        Ok(quote! {
            #[derive(serde::Deserialize)]
            struct #shadow_ident {
                #(#shadow_fields)*
            }

            fn #decode_fn(
                shadow: #shadow_ident,
            ) -> std::result::Result<std::option::Option<#enum_ident>, serde_json::Error> {
                #body
            }

            impl<'de> serde::Deserialize<'de> for #enum_ident {
                fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
                where
                    D: serde::Deserializer<'de>,
                {
                    let shadow = <#shadow_ident as serde::Deserialize>::deserialize(deserializer)?;
                    #decode_fn(shadow)
                        .map_err(<D::Error as serde::de::Error>::custom)?
                        .ok_or_else(|| <D::Error as serde::de::Error>::custom(#no_match))
                }
            }
        })
    }

    fn generate_decode_body(&self, plan: &UnionPlan) -> Result<TokenStream> {
        if plan.options.is_empty() {
            return Ok(quote! {
                let _ = shadow;
                Ok(None)
            });
        }

        let enum_ident = make_ident(&plan.name);
        let option_names: Vec<_> = plan.options.iter().map(|o| o.name.clone()).collect();
        let variants: Vec<_> = variant_names(&plan.name, &option_names)
            .iter()
            .map(|v| make_ident(v))
            .collect();

        let mut built = Vec::with_capacity(plan.options.len());
        for (option, variant) in plan.options.iter().zip(&variants) {
            let construct = self.construct_option(plan, option)?;
            built.push(quote! { #enum_ident::#variant(Box::new(#construct)) });
        }

        match &plan.strategy {
            Strategy::Discriminator { field, variants } => {
                let (tag, _) = field_ident(field);
                let arms = variants.iter().map(|(literal, index)| {
                    let value = &built[*index];
                    let literal = literal.as_str();
                    quote! { Some(#literal) => Some(#value), }
                });
                Ok(quote! {
                    let tag = shadow.#tag.clone();
                    Ok(match tag.as_deref() {
                        #(#arms)*
                        _ => None,
                    })
                })
            }
            Strategy::Structural { order } => {
                let checks = order.iter().map(|&index| {
                    let option = &plan.options[index];
                    let value = &built[index];
                    let present: Vec<_> = option
                        .fields
                        .iter()
                        .map(|f| {
                            let (ident, _) = field_ident(&f.name);
                            quote! { shadow.#ident.is_some() }
                        })
                        .collect();
                    // An option without fields matches any object
                    let condition = if present.is_empty() {
                        quote! { true }
                    } else {
                        quote! { #(#present)&&* }
                    };
                    quote! {
                        if #condition {
                            return Ok(Some(#value));
                        }
                    }
                });
                Ok(quote! {
                    #(#checks)*
                    Ok(None)
                })
            }
        }
    }

    /// Struct literal building one option from the shadow
    fn construct_option(&self, plan: &UnionPlan, option: &OptionPlan) -> Result<TokenStream> {
        let ident = make_ident(&option.name);
        let mut fields = Vec::with_capacity(option.fields.len());

        for field in &option.fields {
            let shadow = plan.shadow_field(&field.name).ok_or_else(|| {
                CodegenError::other(format!(
                    "Field {} of {} is missing from the shadow of {}",
                    field.name, option.name, plan.name
                ))
            })?;
            let (name, _) = field_ident(&field.name);
            let source = quote! { shadow.#name };
            let value = self.shadow_to_field(source, &shadow.kind, field);
            fields.push(quote! { #name: #value, });
        }

        Ok(quote! {
            #ident {
                #(#fields)*
            }
        })
    }

    fn shadow_to_field(
        &self,
        source: TokenStream,
        kind: &ShadowKind,
        field: &ResolvedField,
    ) -> TokenStream {
        let value = match kind {
            ShadowKind::Typed { boxed, .. } if *boxed && !field.is_boxed() => {
                quote! { #source.map(|boxed| *boxed) }
            }
            ShadowKind::Typed { .. } => source,
            ShadowKind::Raw => {
                quote! { #source.map(serde_json::from_value).transpose()? }
            }
            ShadowKind::Union { union, array_depth } => {
                let decode = self.union_field_expr(source, union, *array_depth);
                return quote! { #decode? };
            }
        };

        if field.required {
            quote! { #value.unwrap_or_default() }
        } else {
            value
        }
    }

    /// Expression turning a union shadow into the field value, as a
    /// `Result<_, serde_json::Error>`
    fn union_field_expr(&self, source: TokenStream, union: &str, depth: usize) -> TokenStream {
        let decode_fn = self.decode_fn_ident(union);
        if depth == 0 {
            quote! {
                #source
                    .map(|inner| #decode_fn(*inner))
                    .transpose()
                    .map(std::option::Option::flatten)
            }
        } else {
            sequence_expr(quote! { #source.unwrap_or_default() }, depth, &decode_fn)
        }
    }

    /// Raw struct and `Deserialize` impl for a struct holding union fields
    pub(super) fn generate_host_decoder(&self, descriptor: &StructDescriptor) -> TokenStream {
        let ident = self.type_ident(&descriptor.key);
        let raw_ident = self.raw_ident(&descriptor.key);
        let raw_fields = self.generate_raw_fields(descriptor);

        let assignments = descriptor.fields.iter().map(|field| {
            let (name, _) = field_ident(&field.name);
            match field.union_key() {
                Some(union) => {
                    let decode =
                        self.union_field_expr(quote! { raw.#name }, union, field.array_depth);
                    quote! { #name: #decode.map_err(<D::Error as serde::de::Error>::custom)?, }
                }
                None => quote! { #name: raw.#name, },
            }
        });

        quote! {
            #[derive(serde::Deserialize)]
            struct #raw_ident {
                #(#raw_fields)*
            }

            impl<'de> serde::Deserialize<'de> for #ident {
                fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
                where
                    D: serde::Deserializer<'de>,
                {
                    let raw = <#raw_ident as serde::Deserialize>::deserialize(deserializer)?;
                    Ok(#ident {
                        #(#assignments)*
                    })
                }
            }
        }
    }
}

/// Decode every non-null element, dropping elements no option matches
fn sequence_expr(source: TokenStream, depth: usize, decode_fn: &syn::Ident) -> TokenStream {
    if depth <= 1 {
        quote! {
            #source
                .into_iter()
                .flatten()
                .map(#decode_fn)
                .filter_map(std::result::Result::transpose)
                .collect::<std::result::Result<Vec<_>, serde_json::Error>>()
        }
    } else {
        let inner = sequence_expr(quote! { items }, depth - 1, decode_fn);
        quote! {
            #source
                .into_iter()
                .flatten()
                .map(|items| #inner)
                .collect::<std::result::Result<Vec<_>, serde_json::Error>>()
        }
    }
}
