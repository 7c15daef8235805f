//! The `#[subscriber]` attribute.
//!
//! Expands an inherent impl block into:
//! - the impl block itself, with `#[subscribe]` markers removed
//! - a `Subscriber` impl listing every marked method, when any takes `&self`
//! - a `StaticSubscriber` impl listing the marked methods without a receiver
//! - one `ParamMetadata` inventory entry per field-exploded method, carrying
//!   the parameter names as written in the source

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    FnArg, GenericArgument, Ident, ImplItem, ImplItemFn, ItemImpl, LitStr, Meta, Pat,
    PathArguments, Token, Type, Visibility, bracketed,
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
};

/// Arguments of one `#[subscribe(...)]` marker.
#[derive(Default)]
pub(crate) struct SubscribeArgs {
    /// Explicit target event.
    pub event: Option<Type>,
    /// `Priority` variant name.
    pub priority: Option<Ident>,
    /// Explicit parameter names.
    pub names: Option<Vec<LitStr>>,
}

impl Parse for SubscribeArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = SubscribeArgs::default();
        if input.is_empty() {
            return Ok(args);
        }

        // A leading type, unless this is already `key = value`
        if !(input.peek(Ident) && input.peek2(Token![=])) {
            args.event = Some(input.parse()?);
        }

        while !input.is_empty() {
            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
            if input.is_empty() {
                break;
            }

            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "priority" => {
                    args.priority = Some(input.parse()?);
                }
                "names" => {
                    let content;
                    bracketed!(content in input);
                    let names = Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?;
                    args.names = Some(names.into_iter().collect());
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }
        }

        Ok(args)
    }
}

enum Shape {
    /// A single `&mut EventInstance<E>` parameter.
    Consumer { event: Type },
    /// Shared references to field values.
    Exploded {
        types: Vec<Type>,
        names: Option<Vec<String>>,
    },
}

struct Subscribed {
    ident: Ident,
    is_pub: bool,
    is_static: bool,
    args: SubscribeArgs,
    shape: Shape,
}

pub(crate) fn subscriber_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[subscriber] takes no arguments",
        )
        .to_compile_error()
        .into();
    }
    let mut input = parse_macro_input!(item as ItemImpl);

    match expand(&mut input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &mut ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[subscriber] must be placed on an inherent impl block",
        ));
    }
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[subscriber] does not support generic impl blocks",
        ));
    }

    let mut subscribed = Vec::new();
    for item in &mut input.items {
        if let ImplItem::Fn(method) = item {
            if let Some(args) = take_marker(method)? {
                subscribed.push(analyze(method, args)?);
            }
        }
    }

    let self_ty = &input.self_ty;
    let declaring_type = quote! { concat!(module_path!(), "::", stringify!(#self_ty)) };

    let all: Vec<TokenStream2> = subscribed
        .iter()
        .map(|method| subscription(method, &declaring_type))
        .collect();
    let statics: Vec<TokenStream2> = subscribed
        .iter()
        .filter(|method| method.is_static)
        .map(|method| subscription(method, &declaring_type))
        .collect();
    let metadata: Vec<TokenStream2> = subscribed
        .iter()
        .filter_map(|method| param_metadata(method, &declaring_type))
        .collect();

    // Types with only static subscriptions need not be `Send + Sync`.
    let instance_impl = subscribed.iter().any(|method| !method.is_static).then(|| {
        quote! {
            impl ::tidings::Subscriber for #self_ty {
                #[allow(unused_variables)]
                fn subscriptions(
                    this: &::std::sync::Arc<Self>,
                ) -> ::std::vec::Vec<::tidings::Subscription> {
                    ::std::vec![#(#all),*]
                }
            }
        }
    });

    Ok(quote! {
        #input

        #instance_impl

        impl ::tidings::StaticSubscriber for #self_ty {
            fn static_subscriptions() -> ::std::vec::Vec<::tidings::Subscription> {
                ::std::vec![#(#statics),*]
            }
        }

        #(#metadata)*
    })
}

/// Remove the `#[subscribe]` marker from `method`, returning its arguments.
fn take_marker(method: &mut ImplItemFn) -> syn::Result<Option<SubscribeArgs>> {
    let Some(index) = method
        .attrs
        .iter()
        .position(|attr| attr.path().is_ident("subscribe"))
    else {
        return Ok(None);
    };
    let attr = method.attrs.remove(index);
    let args = match &attr.meta {
        Meta::Path(_) => SubscribeArgs::default(),
        _ => attr.parse_args::<SubscribeArgs>()?,
    };

    if method.attrs.iter().any(|attr| attr.path().is_ident("subscribe")) {
        return Err(syn::Error::new_spanned(
            &method.sig.ident,
            "a method can only be subscribed once",
        ));
    }
    Ok(Some(args))
}

fn analyze(method: &ImplItemFn, args: SubscribeArgs) -> syn::Result<Subscribed> {
    let sig = &method.sig;
    if sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            sig.asyncness,
            "subscriber methods are called synchronously and cannot be async",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "subscriber methods cannot be generic",
        ));
    }

    let mut is_static = true;
    let mut params = Vec::new();
    for input in &sig.inputs {
        match input {
            FnArg::Receiver(receiver) => {
                if receiver.reference.is_none()
                    || receiver.mutability.is_some()
                    || receiver.colon_token.is_some()
                {
                    return Err(syn::Error::new_spanned(
                        receiver,
                        "subscriber methods take `&self` or no receiver",
                    ));
                }
                is_static = false;
            }
            FnArg::Typed(pat_type) => params.push(pat_type),
        }
    }

    let consumed = match params.as_slice() {
        [single] => consumed_event(&single.ty).cloned(),
        _ => None,
    };
    let shape = match consumed {
        Some(event) => Shape::Consumer { event },
        None => {
            let mut types = Vec::with_capacity(params.len());
            let mut names = Some(Vec::with_capacity(params.len()));
            for param in &params {
                match &*param.ty {
                    Type::Reference(reference) if reference.mutability.is_none() => {
                        types.push((*reference.elem).clone());
                    }
                    other => {
                        return Err(syn::Error::new_spanned(
                            other,
                            "subscriber parameters must be `&FieldType`, or a single `&mut EventInstance<E>`",
                        ));
                    }
                }
                match (&*param.pat, names.as_mut()) {
                    (Pat::Ident(pat), Some(names)) => names.push(pat.ident.to_string()),
                    _ => names = None,
                }
            }
            Shape::Exploded { types, names }
        }
    };

    Ok(Subscribed {
        ident: sig.ident.clone(),
        is_pub: matches!(method.vis, Visibility::Public(_)),
        is_static,
        args,
        shape,
    })
}

/// `E` if `ty` is `&mut EventInstance<E>`.
fn consumed_event(ty: &Type) -> Option<&Type> {
    let Type::Reference(reference) = ty else {
        return None;
    };
    reference.mutability?;
    let Type::Path(path) = &*reference.elem else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "EventInstance" {
        return None;
    }
    let PathArguments::AngleBracketed(generics) = &segment.arguments else {
        return None;
    };
    match generics.args.iter().collect::<Vec<_>>().as_slice() {
        [GenericArgument::Type(event)] => Some(event),
        _ => None,
    }
}

fn signature(method: &Subscribed) -> String {
    let types: Vec<String> = match &method.shape {
        Shape::Consumer { event } => {
            vec![format!("EventInstance<{}>", squash(quote!(#event)))]
        }
        Shape::Exploded { types, .. } => types.iter().map(|ty| squash(quote!(#ty))).collect(),
    };
    format!("{}({})", method.ident, types.join(","))
}

fn squash(tokens: TokenStream2) -> String {
    tokens.to_string().chars().filter(|c| !c.is_whitespace()).collect()
}

fn subscription(method: &Subscribed, declaring_type: &TokenStream2) -> TokenStream2 {
    let ident = &method.ident;
    let name = ident.to_string();
    let signature = signature(method);

    let params = match &method.shape {
        Shape::Consumer { event } => quote! { .param::<::tidings::EventInstance<#event>>() },
        Shape::Exploded { types, .. } => quote! { #(.param::<#types>())* },
    };
    let names = method.args.names.as_ref().map(|names| quote! { .names(&[#(#names),*]) });
    let static_method = method.is_static.then(|| quote! { .static_method() });

    let modifiers = match (method.is_pub, method.is_static) {
        (true, true) => quote! { ::tidings::Modifiers::PUBLIC | ::tidings::Modifiers::STATIC },
        (true, false) => quote! { ::tidings::Modifiers::PUBLIC },
        (false, true) => quote! { ::tidings::Modifiers::STATIC },
        (false, false) => quote! { ::tidings::Modifiers::empty() },
    };
    let priority = match &method.args.priority {
        Some(variant) => quote! { ::tidings::Priority::#variant },
        None => quote! { ::tidings::Priority::Normal },
    };
    let declared = match &method.args.event {
        Some(event) => quote! { ::core::option::Option::Some(::tidings::EventType::of::<#event>()) },
        None => quote! { ::core::option::Option::None },
    };

    let (capture, target) = if method.is_static {
        (quote! {}, quote! { Self::#ident })
    } else {
        (
            quote! { let this = ::std::sync::Arc::clone(this); },
            quote! { this.#ident },
        )
    };

    let method_sig = quote! {
        ::tidings::MethodSig::new(#declaring_type, #name)
            .with_signature(#signature)
            #params
            #names
            #static_method
    };

    match &method.shape {
        Shape::Consumer { event } => quote! {
            {
                #capture
                ::tidings::Subscription::consumer::<#event, _>(
                    #method_sig,
                    #modifiers,
                    #priority,
                    #declared,
                    move |event: &mut ::tidings::EventInstance<#event>| #target(event),
                )
            }
        },
        Shape::Exploded { types, .. } => {
            let args: Vec<Ident> = (0..types.len()).map(|i| format_ident!("__arg{}", i)).collect();
            quote! {
                {
                    #capture
                    ::tidings::Subscription::exploded(
                        #method_sig,
                        #modifiers,
                        #priority,
                        #declared,
                        move |#(#args: &#types),*| #target(#(#args),*),
                    )
                }
            }
        }
    }
}

fn param_metadata(method: &Subscribed, declaring_type: &TokenStream2) -> Option<TokenStream2> {
    let Shape::Exploded {
        names: Some(names), ..
    } = &method.shape
    else {
        return None;
    };
    if names.is_empty() {
        return None;
    }
    let signature = signature(method);
    Some(quote! {
        ::tidings::inventory::submit! {
            ::tidings::ParamMetadata {
                declaring_type: #declaring_type,
                signature: #signature,
                names: &[#(#names),*],
            }
        }
    })
}
