//! DOM attribute binding.
//!
//! `set_attr` picks how one attribute value reaches the element: a style or
//! classList helper, a property assignment or an attribute call. The first
//! matching rule wins.

use crate::constants::{
    prop_alias, split_reserved_namespace, ALIASES, CHILD_PROPERTIES, PROPERTIES, SVG_NAMESPACE,
};
use crate::context::CompileContext;
use crate::ir::Expr;
use crate::static_eval::to_property_name;

#[derive(Debug, Clone, Copy, Default)]
pub struct AttrOptions<'t> {
    pub is_svg: bool,
    pub is_custom_element: bool,
    pub dynamic: bool,
    pub tag_name: &'t str,
}

pub fn set_attr(
    ctx: &mut CompileContext,
    elem: &str,
    key: &str,
    value: Expr,
    prev: Option<Expr>,
    opts: AttrOptions<'_>,
) -> Expr {
    let el = Expr::ident(elem);
    let (namespace, name) = match split_reserved_namespace(key) {
        Some((ns, name)) => (Some(ns), name),
        None => (None, key),
    };

    if namespace == Some("style") {
        let style = Expr::member(el, "style");
        return Expr::method_call(style, "setProperty", vec![Expr::str(name), value]);
    }

    if namespace == Some("class") {
        let value = if opts.dynamic { value } else { value.to_boolean() };
        let list = Expr::member(el, "classList");
        return Expr::method_call(list, "toggle", vec![Expr::str(name), value]);
    }

    if name == "style" && namespace.is_none() {
        let helper = ctx.helper("style");
        let mut args = vec![el, value];
        args.extend(prev);
        return Expr::call(helper, args);
    }

    if !opts.is_svg && name == "class" && namespace.is_none() {
        return Expr::assign(Expr::member(el, "className"), value);
    }

    if name == "classList" {
        let helper = ctx.helper("classList");
        let mut args = vec![el, value];
        args.extend(prev);
        return Expr::call(helper, args);
    }

    if opts.dynamic && name == "textContent" {
        return Expr::assign(Expr::member(el, "data"), value);
    }

    let is_child_prop = CHILD_PROPERTIES.contains(name);
    let is_prop = PROPERTIES.contains(name);
    if namespace != Some("attr")
        && (is_child_prop
            || (!opts.is_svg && is_prop)
            || opts.is_custom_element
            || namespace == Some("prop"))
    {
        let mut prop = name.to_string();
        if opts.is_custom_element && !is_child_prop && !is_prop && namespace != Some("prop") {
            prop = to_property_name(name);
        }
        let prop = prop_alias(&prop, opts.tag_name)
            .map(str::to_string)
            .unwrap_or(prop);
        return Expr::assign(Expr::member(el, &prop), value);
    }

    let attr = attribute_name(name, opts.is_svg);
    let ns = attr
        .split_once(':')
        .and_then(|(prefix, _)| SVG_NAMESPACE.get(prefix));
    match ns {
        Some(ns) => {
            let helper = ctx.helper("setAttributeNS");
            Expr::call(helper, vec![el, Expr::str(ns), Expr::str(&attr), value])
        }
        None => {
            let helper = ctx.helper("setAttribute");
            Expr::call(helper, vec![el, Expr::str(&attr), value])
        }
    }
}

/// Canonical attribute name: legacy aliases resolved, HTML names lower-cased.
pub fn attribute_name(name: &str, is_svg: bool) -> String {
    let name = ALIASES.get(name).copied().unwrap_or(name);
    if is_svg {
        name.to_string()
    } else {
        name.to_lowercase()
    }
}
