//! Property bags carried by descriptors and fibers, and the diff hosts use
//! to apply updates.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::element::Child;

pub type StyleMap = BTreeMap<Rc<str>, Rc<str>>;
pub type Attributes = BTreeMap<Rc<str>, PropValue>;

/// Event-style callback stored as a property. Compared by identity.
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn()>);

impl Handler {
    pub fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self) {
        (self.0)()
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        Rc::as_ptr(&self.0) as *const u8 == Rc::as_ptr(&other.0) as *const u8
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

#[derive(Clone)]
pub enum PropValue {
    Str(Rc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Style(Rc<StyleMap>),
    Handler(Handler),
    Child(Child),
    Any(Rc<dyn Any>),
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Int(a), PropValue::Int(b)) => a == b,
            (PropValue::Float(a), PropValue::Float(b)) => a == b,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Style(a), PropValue::Style(b)) => Rc::ptr_eq(a, b) || a == b,
            (PropValue::Handler(a), PropValue::Handler(b)) => a == b,
            (PropValue::Child(a), PropValue::Child(b)) => a == b,
            (PropValue::Any(a), PropValue::Any(b)) => {
                Rc::as_ptr(a) as *const u8 == Rc::as_ptr(b) as *const u8
            }
            _ => false,
        }
    }
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(value) => write!(f, "{value:?}"),
            PropValue::Int(value) => write!(f, "{value}"),
            PropValue::Float(value) => write!(f, "{value}"),
            PropValue::Bool(value) => write!(f, "{value}"),
            PropValue::Style(style) => f.debug_map().entries(style.iter()).finish(),
            PropValue::Handler(_) => f.write_str("<handler>"),
            PropValue::Child(child) => write!(f, "{child:?}"),
            PropValue::Any(_) => f.write_str("<any>"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<Rc<str>> for PropValue {
    fn from(value: Rc<str>) -> Self {
        PropValue::Str(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(i64::from(value))
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<Handler> for PropValue {
    fn from(value: Handler) -> Self {
        PropValue::Handler(value)
    }
}

impl From<StyleMap> for PropValue {
    fn from(value: StyleMap) -> Self {
        PropValue::Style(Rc::new(value))
    }
}

struct PropsData {
    attrs: Attributes,
    children: Child,
}

/// Immutable, cheaply cloned property bag.
#[derive(Clone)]
pub struct Props {
    inner: Rc<PropsData>,
}

impl Default for Props {
    fn default() -> Self {
        Self::new(Attributes::new(), Child::Empty)
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("attrs", &self.inner.attrs)
            .field("children", &self.inner.children)
            .finish()
    }
}

impl Props {
    pub fn new(attrs: Attributes, children: Child) -> Self {
        Self {
            inner: Rc::new(PropsData { attrs, children }),
        }
    }

    pub fn from_children(children: Child) -> Self {
        Self::new(Attributes::new(), children)
    }

    pub fn text(content: Rc<str>) -> Self {
        Self::from_children(Child::Text(content))
    }

    pub fn attrs(&self) -> &Attributes {
        &self.inner.attrs
    }

    pub fn children(&self) -> &Child {
        &self.inner.children
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.inner.attrs.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(PropValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(PropValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(PropValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn handler(&self, name: &str) -> Option<Handler> {
        match self.get(name) {
            Some(PropValue::Handler(handler)) => Some(handler.clone()),
            _ => None,
        }
    }

    pub fn child(&self, name: &str) -> Option<&Child> {
        match self.get(name) {
            Some(PropValue::Child(child)) => Some(child),
            _ => None,
        }
    }

    pub fn any(&self, name: &str) -> Option<&Rc<dyn Any>> {
        match self.get(name) {
            Some(PropValue::Any(value)) => Some(value),
            _ => None,
        }
    }

    /// Content of a text fiber's props.
    pub fn text_content(&self) -> Option<&str> {
        match &self.inner.children {
            Child::Text(content) => Some(content),
            _ => None,
        }
    }

    pub fn ptr_eq(&self, other: &Props) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether the attributes (not the children) are equal.
    pub fn same_attributes(&self, other: &Props) -> bool {
        self.ptr_eq(other) || self.inner.attrs == other.inner.attrs
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StylePatch {
    Set(Rc<str>, Rc<str>),
    Remove(Rc<str>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropPatch {
    Set(Rc<str>, PropValue),
    Remove(Rc<str>),
    /// Nested diff of a style map present on both sides.
    Style {
        name: Rc<str>,
        patches: Vec<StylePatch>,
    },
}

/// Attribute changes between two property bags, in key order.
pub fn diff_props(old: &Props, new: &Props) -> Vec<PropPatch> {
    if old.ptr_eq(new) {
        return Vec::new();
    }
    let mut patches = Vec::new();
    for (name, old_value) in old.attrs() {
        match new.attrs().get(name) {
            None => patches.push(PropPatch::Remove(Rc::clone(name))),
            // style against style is diffed structurally below
            Some(PropValue::Style(_)) if matches!(old_value, PropValue::Style(_)) => {}
            Some(value) if value != old_value => {
                patches.push(PropPatch::Set(Rc::clone(name), value.clone()));
            }
            Some(_) => {}
        }
    }
    for (name, new_value) in new.attrs() {
        match (old.attrs().get(name), new_value) {
            (None, value) => patches.push(PropPatch::Set(Rc::clone(name), value.clone())),
            (Some(PropValue::Style(before)), PropValue::Style(after)) => {
                let style = diff_style(before, after);
                if !style.is_empty() {
                    patches.push(PropPatch::Style {
                        name: Rc::clone(name),
                        patches: style,
                    });
                }
            }
            _ => {}
        }
    }
    patches
}

fn diff_style(old: &StyleMap, new: &StyleMap) -> Vec<StylePatch> {
    let mut patches = Vec::new();
    for name in old.keys() {
        if !new.contains_key(name) {
            patches.push(StylePatch::Remove(Rc::clone(name)));
        }
    }
    for (name, value) in new {
        if old.get(name) != Some(value) {
            patches.push(StylePatch::Set(Rc::clone(name), Rc::clone(value)));
        }
    }
    patches
}

/// Applies style patches to a style map.
pub fn apply_style_patches(style: &mut StyleMap, patches: &[StylePatch]) {
    for patch in patches {
        match patch {
            StylePatch::Set(name, value) => {
                style.insert(Rc::clone(name), Rc::clone(value));
            }
            StylePatch::Remove(name) => {
                style.remove(name);
            }
        }
    }
}
