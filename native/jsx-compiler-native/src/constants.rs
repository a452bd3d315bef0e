//! DOM knowledge tables used by attribute and element compilation.

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "allowfullscreen",
    "async",
    "autofocus",
    "autoplay",
    "checked",
    "controls",
    "default",
    "disabled",
    "formnovalidate",
    "hidden",
    "indeterminate",
    "inert",
    "ismap",
    "loop",
    "multiple",
    "muted",
    "nomodule",
    "novalidate",
    "open",
    "playsinline",
    "readonly",
    "required",
    "reversed",
    "seamless",
    "selected",
];

lazy_static! {
    pub static ref BOOLEANS: HashSet<&'static str> = BOOLEAN_ATTRIBUTES.iter().copied().collect();

    /// Names assigned as DOM properties rather than attributes.
    pub static ref PROPERTIES: HashSet<&'static str> = {
        let mut s: HashSet<&'static str> = BOOLEAN_ATTRIBUTES.iter().copied().collect();
        for p in ["className", "value", "readOnly", "formNoValidate", "isMap", "noModule", "playsInline"] {
            s.insert(p);
        }
        s
    };

    /// Properties that replace the element's children.
    pub static ref CHILD_PROPERTIES: HashSet<&'static str> =
        ["innerHTML", "textContent", "innerText", "children"].into_iter().collect();

    /// JSX attribute names that map to a different HTML attribute.
    pub static ref ALIASES: HashMap<&'static str, &'static str> =
        [("className", "class"), ("htmlFor", "for")].into_iter().collect();

    /// Attribute to property renames, optionally restricted to some tags.
    static ref PROP_ALIASES: HashMap<&'static str, (&'static str, &'static [&'static str])> = {
        let mut m: HashMap<&'static str, (&'static str, &'static [&'static str])> = HashMap::new();
        m.insert("class", ("className", &[] as &[&'static str]));
        m.insert("formnovalidate", ("formNoValidate", &["BUTTON", "INPUT"][..]));
        m.insert("ismap", ("isMap", &["IMG"][..]));
        m.insert("nomodule", ("noModule", &["SCRIPT"][..]));
        m.insert("playsinline", ("playsInline", &["VIDEO"][..]));
        m.insert("readonly", ("readOnly", &["INPUT", "TEXTAREA"][..]));
        m
    };

    pub static ref DELEGATED_EVENTS: HashSet<&'static str> = [
        "beforeinput", "click", "dblclick", "contextmenu", "focusin", "focusout", "input",
        "keydown", "keyup", "mousedown", "mousemove", "mouseout", "mouseover", "mouseup",
        "pointerdown", "pointermove", "pointerout", "pointerover", "pointerup",
        "touchend", "touchmove", "touchstart",
    ]
    .into_iter()
    .collect();

    pub static ref SVG_ELEMENTS: HashSet<&'static str> = [
        "altGlyph", "altGlyphDef", "altGlyphItem", "animate", "animateColor", "animateMotion",
        "animateTransform", "circle", "clipPath", "color-profile", "cursor", "defs", "desc",
        "ellipse", "feBlend", "feColorMatrix", "feComponentTransfer", "feComposite",
        "feConvolveMatrix", "feDiffuseLighting", "feDisplacementMap", "feDistantLight",
        "feDropShadow", "feFlood", "feFuncA", "feFuncB", "feFuncG", "feFuncR",
        "feGaussianBlur", "feImage", "feMerge", "feMergeNode", "feMorphology", "feOffset",
        "fePointLight", "feSpecularLighting", "feSpotLight", "feTile", "feTurbulence",
        "filter", "font", "font-face", "font-face-format", "font-face-name", "font-face-src",
        "font-face-uri", "foreignObject", "g", "glyph", "glyphRef", "hkern", "image", "line",
        "linearGradient", "marker", "mask", "metadata", "missing-glyph", "mpath", "path",
        "pattern", "polygon", "polyline", "radialGradient", "rect", "set", "stop", "svg",
        "switch", "symbol", "text", "textPath", "tref", "tspan", "use", "view", "vkern",
    ]
    .into_iter()
    .collect();

    pub static ref SVG_NAMESPACE: HashMap<&'static str, &'static str> = [
        ("xlink", "http://www.w3.org/1999/xlink"),
        ("xml", "http://www.w3.org/XML/1998/namespace"),
    ]
    .into_iter()
    .collect();

    pub static ref VOID_ELEMENTS: HashSet<&'static str> = [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link",
        "menuitem", "meta", "param", "source", "track", "wbr",
    ]
    .into_iter()
    .collect();

    /// Namespaces the compiler interprets instead of passing through.
    pub static ref RESERVED_NAMESPACES: HashSet<&'static str> =
        ["class", "on", "oncapture", "style", "use", "prop", "attr"].into_iter().collect();

    /// Namespaces that cannot be folded into a runtime spread.
    pub static ref NON_SPREAD_NAMESPACES: HashSet<&'static str> =
        ["class", "style", "use", "prop", "attr"].into_iter().collect();
}

pub fn prop_alias(name: &str, tag_name: &str) -> Option<&'static str> {
    let (alias, tags) = PROP_ALIASES.get(name)?;
    let upper = tag_name.to_uppercase();
    if tags.is_empty() || tags.iter().any(|t| *t == upper) {
        Some(*alias)
    } else {
        None
    }
}

/// Splits `ns:name` when `ns` is a namespace the compiler understands.
pub fn split_reserved_namespace(key: &str) -> Option<(&str, &str)> {
    let (ns, name) = key.split_once(':')?;
    if RESERVED_NAMESPACES.contains(ns) && !name.is_empty() {
        Some((ns, name))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prop_alias_respects_tag() {
        assert_eq!(prop_alias("readonly", "input"), Some("readOnly"));
        assert_eq!(prop_alias("readonly", "div"), None);
        assert_eq!(prop_alias("class", "div"), Some("className"));
    }

    #[test]
    fn reserved_namespaces() {
        assert_eq!(split_reserved_namespace("style:color"), Some(("style", "color")));
        assert_eq!(split_reserved_namespace("xlink:href"), None);
        assert_eq!(split_reserved_namespace("title"), None);
    }
}
