use crate::registry::UnionDescriptor;
use proc_macro2::TokenStream;
use quote::quote;

use super::CodeGenerator;
use super::names::variant_names;
use super::utils::{generate_doc_comment, make_ident};

impl<'r> CodeGenerator<'r> {
    /// Generate a union enum and its capability trait
    ///
    /// Every option struct implements the trait, answering `Some(self)` for
    /// its own accessor and `None` for the rest. The enum implements it by
    /// dispatching on the active variant.
    pub(super) fn generate_union(&self, union: &UnionDescriptor) -> TokenStream {
        let enum_ident = make_ident(&union.name);
        let trait_ident = self.trait_ident(union);
        let doc = generate_doc_comment(union.description.as_deref());

        let option_names = self.option_names(union);
        let variants: Vec<_> = variant_names(&union.name, &option_names)
            .iter()
            .map(|v| make_ident(v))
            .collect();
        let option_idents: Vec<_> = option_names.iter().map(|o| make_ident(o)).collect();
        let accessors: Vec<_> = option_names
            .iter()
            .map(|o| self.accessor_ident(union, o))
            .collect();

        let trait_doc = format!("Access the options of [`{}`]", union.name);
        let trait_methods = accessors.iter().zip(&option_idents).map(|(accessor, option)| {
            quote! {
                fn #accessor(&self) -> std::option::Option<&#option> {
                    None
                }
            }
        });

        let option_impls = accessors.iter().zip(&option_idents).map(|(accessor, option)| {
            quote! {
                impl #trait_ident for #option {
                    fn #accessor(&self) -> std::option::Option<&#option> {
                        Some(self)
                    }
                }
            }
        });

        let enum_methods = accessors
            .iter()
            .zip(&option_idents)
            .zip(&variants)
            .map(|((accessor, option), variant)| {
                quote! {
                    fn #accessor(&self) -> std::option::Option<&#option> {
                        match self {
                            #enum_ident::#variant(inner) => Some(&**inner),
                            #[allow(unreachable_patterns)]
                            _ => None,
                        }
                    }
                }
            });

        quote! {
            #doc
            #[derive(serde::Serialize, Debug, Clone, PartialEq)]
            #[serde(untagged)]
            pub enum #enum_ident {
                #(#variants(Box<#option_idents>),)*
            }

            #[doc = #trait_doc]
            pub trait #trait_ident {
                #(#trait_methods)*
            }

            #(#option_impls)*

            impl #trait_ident for #enum_ident {
                #(#enum_methods)*
            }
        }
    }
}
