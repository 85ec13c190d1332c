use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one and inject
/// dependencies.
///
/// Injectable dependencies are `TestEngine`, a fresh engine over an empty
/// in-memory store, and `RecordingDispatcher`. Given a scenario name, as in
/// `#[engine_test(majority_win)]`, the engine is first populated with that
/// closed session and its ID can be injected as `SessionId`.
#[proc_macro_attribute]
pub fn engine_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);
    let scenario = parse_macro_input!(args as Option<Ident>);

    // Extract injected arguments and reject invalid function signatures.
    let test_args = match check_sig(&item_fn.sig, scenario.is_some()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    let maybe_populate = scenario
        .map(|scenario| {
            quote! {
                let session_id = crate::fixtures::populate(
                    &engine,
                    crate::fixtures::Scenario::#scenario(),
                )
                .await;
            }
        })
        .unwrap_or_default();

    // Rewrite the test function.
    quote! {
        #[test]
        #[allow(unused_variables)]
        fn #name() {
            /// The test itself.
            #item_fn

            crate::fixtures::init_logging();

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .thread_name("engine-test")
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let engine = crate::fixtures::engine();
                let dispatcher = crate::events::RecordingDispatcher::new();

                #maybe_populate

                #new_name(#(#test_args),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: &Signature, has_scenario: bool) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_engine = false;
    let mut has_dispatcher = false;
    let mut has_session = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                if let Some(type_ident) = type_path.path.get_ident() {
                    if type_ident == "TestEngine" {
                        if has_engine {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `TestEngine`",
                            ));
                        }
                        has_engine = true;
                        args.push(quote! { engine });
                        continue;
                    } else if type_ident == "RecordingDispatcher" {
                        if has_dispatcher {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `RecordingDispatcher`",
                            ));
                        }
                        has_dispatcher = true;
                        args.push(quote! { dispatcher });
                        continue;
                    } else if type_ident == "SessionId" {
                        if !has_scenario {
                            return Err(syn::Error::new(
                                input.span(),
                                "A `SessionId` needs a scenario, as in `#[engine_test(majority_win)]`",
                            ));
                        }
                        if has_session {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `SessionId`",
                            ));
                        }
                        has_session = true;
                        args.push(quote! { session_id });
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `engine: TestEngine`, `dispatcher: RecordingDispatcher` or `session_id: SessionId`",
        ));
    }

    Ok(args)
}
