use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one and inject
/// dependencies. Every test gets its own freshly seeded store.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`] (as
/// `Client`) and `crate::store::Store` (as `Store`). With
/// `#[backend_test(voter)]`, the voter `alice` / `pw123` is registered and
/// logged in first, and their `SessionToken` may be injected too.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Register and log in a voter if needed.
    let voter = match parse_macro_input!(args as Option<Ident>) {
        None => false,
        Some(arg) if arg == "voter" => true,
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected no argument or `voter`")
                .into_compile_error()
                .into();
        }
    };

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(&item_fn.sig, voter) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    let maybe_login = if voter {
        quote! {
            let voter = crate::store::CredentialStore::create_user(
                &*store,
                "alice",
                "alice@example.com",
                "pw123",
            )
            .unwrap();
            let voter_token = crate::store::SessionStore::issue_token(&*store, voter.id).unwrap();
        }
    } else {
        quote! {}
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// The test itself.
            #item_fn

            log4rs_test_utils::test_logging::init_logging_once_for(
                ["voting_backend"],
                None,
                None,
            );

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(2)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let store: crate::store::Store = crate::test_store();

                #maybe_login

                let rocket_client = rocket::local::asynchronous::Client::tracked(
                    crate::rocket_for_store(store.clone()),
                )
                .await
                .unwrap();

                #new_name(#(#test_args),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, and map each parameter to the value
/// injected for it.
fn check_sig(sig: &Signature, voter: bool) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_store = false;
    let mut has_token = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                if let Some(segment) = type_path.path.segments.last() {
                    let (seen, injected) = if segment.ident == "Client" {
                        (&mut has_client, quote! { rocket_client })
                    } else if segment.ident == "Store" {
                        (&mut has_store, quote! { store.clone() })
                    } else if segment.ident == "SessionToken" && voter {
                        (&mut has_token, quote! { voter_token.clone() })
                    } else if segment.ident == "SessionToken" {
                        return Err(syn::Error::new(
                            input.span(),
                            "A `SessionToken` can only be injected with `#[backend_test(voter)]`",
                        ));
                    } else {
                        return Err(syn::Error::new(
                            input.span(),
                            "Expected one of `Client`, `Store` or `SessionToken`",
                        ));
                    };
                    if *seen {
                        return Err(syn::Error::new(
                            input.span(),
                            format!("Test cannot accept more than one `{}`", segment.ident),
                        ));
                    }
                    *seen = true;
                    args.push(injected);
                    continue;
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected `ident: Client`, `ident: Store` or `ident: SessionToken`",
        ));
    }

    Ok(args)
}
