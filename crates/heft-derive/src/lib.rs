use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, quote_spanned};
use syn::{parse, Data, DataEnum, DataStruct, DeriveInput, Fields, Generics, Ident, Index};

#[proc_macro_derive(Inspect)]
pub fn derive_inspect(input: TokenStream) -> TokenStream {
    let derive_input: DeriveInput = parse(input).unwrap();

    match derive_input.data {
        Data::Struct(ref struct_data) => {
            derive_inspect_for_struct(&derive_input.ident, struct_data, &derive_input.generics)
        }

        Data::Enum(ref enum_data) => {
            derive_inspect_for_enum(&derive_input.ident, enum_data, &derive_input.generics)
        }

        // There is no way of knowing which union member is active, so no
        // shape can describe one.
        Data::Union(_) => panic!("unions are not supported"),
    }
}

/// One `FieldDef` literal. The accessor downcasts the erased value back to
/// `Self` and borrows the field; for enum variants it returns `None` when
/// the variant is not the active one.
fn field_def(name: String, field_ty: &syn::Type, access: TokenStream2) -> TokenStream2 {
    quote! {
        heft::shape::FieldDef {
            name: #name,
            shape: <#field_ty as heft::Inspect>::shape,
            access: {
                let access: heft::shape::FieldAccess = #access;
                access
            },
        }
    }
}

/// Wraps a built `Shape` expression into the three `Inspect` methods. The
/// shape of a non-generic type lives in a function-local static; generic
/// instantiations go through the process-wide registry instead, one entry
/// per instantiation.
fn inspect_impl(
    type_name: &Ident,
    generics: &Generics,
    build_shape: TokenStream2,
) -> TokenStream {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let is_generic =
        generics.type_params().next().is_some() || generics.const_params().next().is_some();

    let shape_body = if is_generic {
        quote! { heft::shape::intern::<Self>(|| #build_shape) }
    } else {
        quote! {
            static SHAPE: heft::__rt::OnceCell<heft::Shape> = heft::__rt::OnceCell::new();
            SHAPE.get_or_init(|| #build_shape)
        }
    };

    (quote! {
        #[allow(dead_code)]
        impl #impl_generics heft::Inspect for #type_name #ty_generics #where_clause {
            fn shape() -> &'static heft::Shape {
                #shape_body
            }

            fn shape_of(&self) -> &'static heft::Shape {
                <Self as heft::Inspect>::shape()
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }
    })
    .into()
}

fn derive_inspect_for_struct(
    struct_name: &Ident,
    data: &DataStruct,
    generics: &Generics,
) -> TokenStream {
    let mut field_defs = Vec::new();
    let mut offset_probes = Vec::new();

    match &data.fields {
        Fields::Named(fields) => {
            for field in &fields.named {
                let ident = field.ident.as_ref().unwrap();
                let span = ident.span();
                let access = quote_spanned! { span =>
                    |value| {
                        value
                            .as_any()
                            .downcast_ref::<Self>()
                            .map(|owner| &owner.#ident as &dyn heft::Inspect)
                    }
                };
                field_defs.push(field_def(ident.to_string(), &field.ty, access));
                offset_probes.push(quote! {
                    (std::ptr::addr_of!((*base).#ident) as usize) - (base as usize)
                });
            }
        }

        Fields::Unit => {}

        Fields::Unnamed(fields) => {
            for (index, field) in fields.unnamed.iter().enumerate() {
                let index = Index::from(index);
                let access = quote! {
                    |value| {
                        value
                            .as_any()
                            .downcast_ref::<Self>()
                            .map(|owner| &owner.#index as &dyn heft::Inspect)
                    }
                };
                field_defs.push(field_def(index.index.to_string(), &field.ty, access));
                offset_probes.push(quote! {
                    (std::ptr::addr_of!((*base).#index) as usize) - (base as usize)
                });
            }
        }
    }

    // Offsets come off a synthetic instance; only addresses are taken, no
    // field is ever read and no destructor ever runs.
    let offsets = if offset_probes.is_empty() {
        quote! { None }
    } else {
        quote! {
            Some({
                let offsets: heft::shape::OffsetsFn = || {
                    let probe = std::mem::MaybeUninit::<Self>::uninit();
                    let base = probe.as_ptr();
                    unsafe { vec![#(#offset_probes),*] }
                };
                offsets
            })
        }
    };

    let build_shape = quote! {
        heft::Shape::composite::<Self>(
            vec![#(#field_defs),*],
            #offsets,
        )
    };

    inspect_impl(struct_name, generics, build_shape)
}

fn derive_inspect_for_enum(
    enum_name: &Ident,
    data: &DataEnum,
    generics: &Generics,
) -> TokenStream {
    let mut field_defs = Vec::new();

    for variant in &data.variants {
        let variant_ident = &variant.ident;
        let span = variant_ident.span();

        // Both named and tuple payloads go through the braced pattern form,
        // `Variant { 0: binding, .. }` being valid for tuple variants.
        let mut keyed = |key: TokenStream2, name: String, field_ty: &syn::Type| {
            let access = quote_spanned! { span =>
                |value| {
                    match value.as_any().downcast_ref::<Self>() {
                        Some(Self::#variant_ident { #key: inner, .. }) => {
                            Some(inner as &dyn heft::Inspect)
                        }
                        _ => None,
                    }
                }
            };
            field_defs.push(field_def(name, field_ty, access));
        };

        match &variant.fields {
            Fields::Named(fields) => {
                for field in &fields.named {
                    let ident = field.ident.as_ref().unwrap();
                    keyed(
                        quote! { #ident },
                        format!("{}.{}", variant_ident, ident),
                        &field.ty,
                    );
                }
            }

            Fields::Unit => {}

            Fields::Unnamed(fields) => {
                for (index, field) in fields.unnamed.iter().enumerate() {
                    let index = Index::from(index);
                    keyed(
                        quote! { #index },
                        format!("{}.{}", variant_ident, index.index),
                        &field.ty,
                    );
                }
            }
        }
    }

    // Variant payloads cannot be probed on a synthetic instance, so an enum
    // reports no offsets and its body size falls back to the padded stride.
    let build_shape = quote! {
        heft::Shape::composite::<Self>(
            vec![#(#field_defs),*],
            None,
        )
    };

    inspect_impl(enum_name, generics, build_shape)
}
