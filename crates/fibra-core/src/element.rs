//! Descriptors: immutable values describing what to render.

use std::fmt;
use std::rc::Rc;

use crate::context::ContextId;
use crate::mutable_ref::HostRef;
use crate::props::{Attributes, Handler, PropValue, Props, StyleMap};

pub type Key = Rc<str>;

/// Function component. Two components are the same type only when they
/// share the same render closure.
#[derive(Clone)]
pub struct Component {
    name: Rc<str>,
    render: Rc<dyn Fn(&Props) -> Child>,
}

impl Component {
    pub fn new(name: &str, render: impl Fn(&Props) -> Child + 'static) -> Self {
        Self {
            name: Rc::from(name),
            render: Rc::new(render),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn render(&self, props: &Props) -> Child {
        (self.render)(props)
    }

    pub fn element(&self) -> ElementBuilder {
        ElementBuilder::new(ElementType::Component(self.clone()))
    }

    pub fn same(&self, other: &Component) -> bool {
        Rc::as_ptr(&self.render) as *const u8 == Rc::as_ptr(&other.render) as *const u8
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.name)
    }
}

#[derive(Clone, Debug)]
pub enum ElementType {
    Host(Rc<str>),
    Component(Component),
    Fragment,
    Provider(ContextId),
    Suspense,
}

impl ElementType {
    pub fn same(&self, other: &ElementType) -> bool {
        match (self, other) {
            (ElementType::Host(a), ElementType::Host(b)) => a == b,
            (ElementType::Component(a), ElementType::Component(b)) => a.same(b),
            (ElementType::Fragment, ElementType::Fragment) => true,
            (ElementType::Provider(a), ElementType::Provider(b)) => a == b,
            (ElementType::Suspense, ElementType::Suspense) => true,
            _ => false,
        }
    }
}

struct ElementData {
    key: Option<Key>,
    host_ref: Option<HostRef>,
    ty: ElementType,
    props: Props,
}

/// A described element. Cheap to clone.
#[derive(Clone)]
pub struct Element {
    data: Rc<ElementData>,
}

impl Element {
    pub fn key(&self) -> Option<&Key> {
        self.data.key.as_ref()
    }

    pub fn host_ref(&self) -> Option<&HostRef> {
        self.data.host_ref.as_ref()
    }

    pub fn ty(&self) -> &ElementType {
        &self.data.ty
    }

    pub fn props(&self) -> &Props {
        &self.data.props
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self.data.ty, ElementType::Fragment)
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Element");
        debug.field("type", &self.data.ty);
        if let Some(key) = &self.data.key {
            debug.field("key", key);
        }
        debug.field("props", &self.data.props).finish()
    }
}

/// Anything that can appear as `props.children`.
#[derive(Clone, Default)]
pub enum Child {
    #[default]
    Empty,
    Text(Rc<str>),
    Element(Element),
    Array(Rc<[Child]>),
}

impl Child {
    pub fn is_empty(&self) -> bool {
        matches!(self, Child::Empty)
    }

    pub fn array(children: impl IntoIterator<Item = impl Into<Child>>) -> Child {
        let items: Vec<Child> = children.into_iter().map(Into::into).collect();
        Child::Array(Rc::from(items))
    }
}

impl PartialEq for Child {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Child::Empty, Child::Empty) => true,
            (Child::Text(a), Child::Text(b)) => a == b,
            (Child::Element(a), Child::Element(b)) => a.ptr_eq(b),
            (Child::Array(a), Child::Array(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Child::Empty => f.write_str("Empty"),
            Child::Text(text) => write!(f, "{text:?}"),
            Child::Element(element) => fmt::Debug::fmt(element, f),
            Child::Array(items) => f.debug_list().entries(items.iter()).finish(),
        }
    }
}

impl From<Element> for Child {
    fn from(value: Element) -> Self {
        Child::Element(value)
    }
}

impl From<ElementBuilder> for Child {
    fn from(value: ElementBuilder) -> Self {
        Child::Element(value.build())
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Text(Rc::from(value))
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Text(Rc::from(value))
    }
}

impl From<Rc<str>> for Child {
    fn from(value: Rc<str>) -> Self {
        Child::Text(value)
    }
}

macro_rules! child_from_number {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Child {
            fn from(value: $ty) -> Self {
                Child::Text(Rc::from(value.to_string()))
            }
        })*
    };
}

child_from_number!(i32, i64, u32, u64, usize, f64);

impl From<Vec<Child>> for Child {
    fn from(value: Vec<Child>) -> Self {
        Child::Array(Rc::from(value))
    }
}

impl From<Vec<Element>> for Child {
    fn from(value: Vec<Element>) -> Self {
        Child::array(value)
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(value: Option<T>) -> Self {
        value.map_or(Child::Empty, Into::into)
    }
}

impl From<()> for Child {
    fn from(_: ()) -> Self {
        Child::Empty
    }
}

/// Builder for descriptors.
///
/// `child` appends one child. `children` appends a whole list as a single
/// array child, so keyed lists reconcile as lists even with one entry.
pub struct ElementBuilder {
    ty: ElementType,
    key: Option<Key>,
    host_ref: Option<HostRef>,
    attrs: Attributes,
    children: Vec<Child>,
}

impl ElementBuilder {
    pub fn new(ty: ElementType) -> Self {
        Self {
            ty,
            key: None,
            host_ref: None,
            attrs: Attributes::new(),
            children: Vec::new(),
        }
    }

    pub fn key(mut self, key: impl fmt::Display) -> Self {
        self.key = Some(Rc::from(key.to_string()));
        self
    }

    pub fn attr(mut self, name: &str, value: impl Into<PropValue>) -> Self {
        self.attrs.insert(Rc::from(name), value.into());
        self
    }

    /// Sets one entry of the `style` map.
    pub fn style(mut self, name: &str, value: &str) -> Self {
        let mut style: StyleMap = match self.attrs.get("style") {
            Some(PropValue::Style(existing)) => (**existing).clone(),
            _ => StyleMap::new(),
        };
        style.insert(Rc::from(name), Rc::from(value));
        self.attrs.insert(Rc::from("style"), PropValue::from(style));
        self
    }

    pub fn on(self, name: &str, handler: impl Fn() + 'static) -> Self {
        self.attr(name, Handler::new(handler))
    }

    pub fn host_ref(mut self, host_ref: HostRef) -> Self {
        self.host_ref = Some(host_ref);
        self
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = impl Into<Child>>) -> Self {
        self.children.push(Child::array(children));
        self
    }

    /// Whether a suspense boundary shows its fallback.
    pub fn suspended(self, suspended: bool) -> Self {
        self.attr(SUSPENDED, suspended)
    }

    pub fn build(self) -> Element {
        let mut children = self.children;
        let children = match children.len() {
            0 => Child::Empty,
            1 => children.pop().unwrap_or_default(),
            _ => Child::Array(Rc::from(children)),
        };
        Element {
            data: Rc::new(ElementData {
                key: self.key,
                host_ref: self.host_ref,
                ty: self.ty,
                props: Props::new(self.attrs, children),
            }),
        }
    }
}

impl From<ElementBuilder> for Element {
    fn from(value: ElementBuilder) -> Self {
        value.build()
    }
}

pub(crate) const SUSPENDED: &str = "suspended";
pub(crate) const FALLBACK: &str = "fallback";

/// Host element of type `ty`.
pub fn h(ty: &str) -> ElementBuilder {
    ElementBuilder::new(ElementType::Host(Rc::from(ty)))
}

pub fn text(content: impl Into<Rc<str>>) -> Child {
    Child::Text(content.into())
}

pub fn fragment() -> ElementBuilder {
    ElementBuilder::new(ElementType::Fragment)
}

/// Suspense boundary rendering `fallback` while suspended.
pub fn suspense(fallback: impl Into<Child>) -> ElementBuilder {
    ElementBuilder::new(ElementType::Suspense).attr(FALLBACK, PropValue::Child(fallback.into()))
}
