use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Fields, Index};

#[proc_macro_derive(WireSerde)]
pub fn serdes_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let expanded = match input.data {
        Data::Struct(data) => {
            let (serialize_body, deserialize_body) = match data.fields {
                Fields::Named(fields) => {
                    let field_names: Vec<_> =
                        fields.named.iter().map(|f| f.ident.as_ref().unwrap()).collect();
                    let field_types: Vec<_> = fields.named.iter().map(|f| &f.ty).collect();
                    (
                        quote! {
                            #(
                                ::serdes::WireSerde::serialize_into(&self.#field_names, &mut writer)?;
                            )*
                        },
                        quote! {
                            Ok(Self {
                                #(
                                    #field_names: <#field_types as ::serdes::WireSerde>::deserialize_from(&mut reader)?,
                                )*
                            })
                        },
                    )
                }
                Fields::Unnamed(fields) => {
                    let field_indices: Vec<_> = (0..fields.unnamed.len()).map(Index::from).collect();
                    let field_types: Vec<_> = fields.unnamed.iter().map(|f| &f.ty).collect();
                    (
                        quote! {
                            #(
                                ::serdes::WireSerde::serialize_into(&self.#field_indices, &mut writer)?;
                            )*
                        },
                        quote! {
                            Ok(Self(
                                #(
                                    <#field_types as ::serdes::WireSerde>::deserialize_from(&mut reader)?,
                                )*
                            ))
                        },
                    )
                }
                Fields::Unit => (quote! {}, quote! { Ok(Self) }),
            };

            quote! {
                impl #impl_generics ::serdes::WireSerde for #name #ty_generics #where_clause {
                    #[allow(unused_mut)]
                    fn serialize_into<W: std::io::Write>(&self, mut writer: W) -> ::serdes::SerdeResult<()> {
                        #serialize_body
                        Ok(())
                    }

                    #[allow(unused_mut)]
                    fn deserialize_from<R: std::io::Read>(mut reader: R) -> ::serdes::SerdeResult<Self> {
                        #deserialize_body
                    }
                }
            }
        }
        Data::Enum(data) => {
            let mut serialize_arms = Vec::new();
            let mut deserialize_arms = Vec::new();
            for (idx, variant) in data.variants.iter().enumerate() {
                let vname = &variant.ident;
                let tag = idx as u32;
                match &variant.fields {
                    Fields::Unit => {
                        serialize_arms.push(quote! {
                            Self::#vname => {
                                ::serdes::WireSerde::serialize_into(&#tag, &mut writer)?;
                            }
                        });
                        deserialize_arms.push(quote! {
                            #tag => Ok(Self::#vname),
                        });
                    }
                    Fields::Unnamed(fields) => {
                        let field_idents: Vec<_> = (0..fields.unnamed.len())
                            .map(|i| format_ident!("f{}", i))
                            .collect();
                        serialize_arms.push(quote! {
                            Self::#vname( #( #field_idents ),* ) => {
                                ::serdes::WireSerde::serialize_into(&#tag, &mut writer)?;
                                #(
                                    ::serdes::WireSerde::serialize_into(#field_idents, &mut writer)?;
                                )*
                            }
                        });
                        let deser_fields = field_idents.iter().map(
                            |_| quote! { ::serdes::WireSerde::deserialize_from(&mut reader)? },
                        );
                        deserialize_arms.push(quote! {
                            #tag => Ok(Self::#vname( #(#deser_fields),* )),
                        });
                    }
                    Fields::Named(fields) => {
                        let field_idents: Vec<_> = fields
                            .named
                            .iter()
                            .map(|f| f.ident.as_ref().unwrap())
                            .collect();
                        serialize_arms.push(quote! {
                            Self::#vname { #( #field_idents ),* } => {
                                ::serdes::WireSerde::serialize_into(&#tag, &mut writer)?;
                                #(
                                    ::serdes::WireSerde::serialize_into(#field_idents, &mut writer)?;
                                )*
                            }
                        });
                        let deser_fields = field_idents.iter().map(|ident| {
                            quote! { #ident: ::serdes::WireSerde::deserialize_from(&mut reader)? }
                        });
                        deserialize_arms.push(quote! {
                            #tag => Ok(Self::#vname { #(#deser_fields),* }),
                        });
                    }
                }
            }
            quote! {
                impl #impl_generics ::serdes::WireSerde for #name #ty_generics #where_clause {
                    fn serialize_into<W: std::io::Write>(&self, mut writer: W) -> ::serdes::SerdeResult<()> {
                        match self {
                            #(#serialize_arms)*
                        }
                        Ok(())
                    }

                    fn deserialize_from<R: std::io::Read>(mut reader: R) -> ::serdes::SerdeResult<Self> {
                        let variant_index: u32 = ::serdes::WireSerde::deserialize_from(&mut reader)?;
                        match variant_index {
                            #(#deserialize_arms)*
                            _ => Err(::serdes::SerdeError::InvalidVariantIndex(variant_index as usize)),
                        }
                    }
                }
            }
        }
        Data::Union(_) => {
            quote! {
                compile_error!("Unions are not supported by WireSerde derive macro");
            }
        }
    };

    expanded.into()
}
