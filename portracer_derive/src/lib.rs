use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data::Struct, DeriveInput};

/*
--------------------------------------------------------------------------------
||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||||
--------------------------------------------------------------------------------
*/

/// Implements `ShaderType` for a `#[repr(C)]` Pod struct, generating the WGSL
/// struct definition from the Rust fields.
///
/// Every field type must itself implement `ShaderType`. The field order and
/// names are kept as-is, so the host layout and the shader layout only match
/// if the Rust struct has no implicit padding (which `bytemuck::Pod` already
/// enforces).
#[proc_macro_derive(ShaderType)]
pub fn shader_type_derive(input: TokenStream) -> TokenStream {
	let input = parse_macro_input!(input as DeriveInput);

	let name = input.ident;

	let out = match input.data {
		Struct(s) => {
			let fields = s.fields.into_iter().map(|f| {
				let field_name = f.ident.expect("All struct fields need an identifier");
				let field_type = f.ty;

				quote!(format!(
					"\t{}: {},",
					stringify!(#field_name),
					<#field_type as crate::core::buffer::ShaderType>::type_name()
				),)
			});

			quote! {
				impl crate::core::buffer::ShaderType for #name {
					fn type_name() -> String {
						stringify!(#name).to_string()
					}

					fn struct_definition() -> Option<String> {
						let fields: ::std::vec::Vec<String> = ::std::vec![#(#fields)*];
						Some(format!("struct {} {{\n{}\n}}\n", stringify!(#name), fields.join("\n")))
					}
				}
			}
		}
		_ => panic!("ShaderType can only be derived for structs"),
	};

	out.into()
}
