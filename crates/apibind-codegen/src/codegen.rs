use crate::decode::DecodePlans;
use crate::error::Result;
use crate::overrides::OverrideTables;
use crate::registry::TypeRegistry;
use crate::resolver::Resolution;
use proc_macro2::TokenStream;
use quote::quote;
use smol_str::SmolStr;
use std::collections::BTreeSet;

mod decode;
mod names;
mod output;
mod structs;
mod types;
mod unions;
mod utils;

/// Code generator for a resolved schema
pub struct CodeGenerator<'r> {
    registry: &'r TypeRegistry,
    plans: &'r DecodePlans<'r>,
    overrides: &'r OverrideTables,
    placeholders: &'r BTreeSet<SmolStr>,
    schema_version: Option<String>,
}

impl<'r> CodeGenerator<'r> {
    /// Create a new code generator
    pub fn new(
        resolution: &'r Resolution,
        plans: &'r DecodePlans<'r>,
        overrides: &'r OverrideTables,
    ) -> Self {
        Self {
            registry: &resolution.registry,
            plans,
            overrides,
            placeholders: &resolution.placeholders,
            schema_version: None,
        }
    }

    /// Record the schema version in the generated file headers
    pub fn with_schema_version(mut self, version: Option<String>) -> Self {
        self.schema_version = version;
        self
    }

    /// Declarations: structs, unions with their traits, and placeholders,
    /// sorted by emitted name
    pub fn generate_types(&self) -> TokenStream {
        let mut items: Vec<(SmolStr, TokenStream)> = Vec::new();

        for name in self.placeholders {
            let ident = types::placeholder_ident(name);
            let doc = format!("`{}` is not defined by the schema", name);
            items.push((
                SmolStr::new(ident.to_string()),
                quote! {
                    #[doc = #doc]
                    pub type #ident = serde_json::Value;
                },
            ));
        }
        for descriptor in self.registry.structs() {
            items.push((descriptor.name.clone(), self.generate_struct(descriptor)));
        }
        for union in self.registry.unions() {
            items.push((union.name.clone(), self.generate_union(union)));
        }

        items.sort_by(|a, b| a.0.cmp(&b.0));
        let items = items.into_iter().map(|(_, tokens)| tokens);
        quote! { #(#items)* }
    }

    /// Shadows, decode functions and `Deserialize` impls, sorted by emitted name
    pub fn generate_decoders(&self) -> Result<TokenStream> {
        let mut unions = Vec::new();
        for plan in self.plans.unions() {
            unions.push((plan.name.clone(), self.generate_union_decoder(plan)?));
        }
        unions.sort_by(|a, b| a.0.cmp(&b.0));

        let mut hosts: Vec<_> = self
            .plans
            .hosts()
            .map(|host| (host.name.clone(), self.generate_host_decoder(host)))
            .collect();
        hosts.sort_by(|a, b| a.0.cmp(&b.0));

        let unions = unions.into_iter().map(|(_, tokens)| tokens);
        let hosts = hosts.into_iter().map(|(_, tokens)| tokens);
        Ok(quote! {
            #[allow(unused_imports)]
            use super::types::*;

            #(#unions)*
            #(#hosts)*
        })
    }
}
