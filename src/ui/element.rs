//! Server-side element tree
//!
//! Small enough to render the application shell. Components see session
//! state only through the nearest enclosing provider.

use std::fmt;
use std::sync::Arc;

use super::provider::SessionContext;
use crate::error::AppError;

/// A piece of UI that reads session state while rendering
pub trait Component: Send + Sync {
    fn render(&self, session: &SessionContext) -> Element;
}

/// UI tree node
#[derive(Clone)]
pub enum Element {
    Text(String),
    Node {
        tag: &'static str,
        attrs: Vec<(&'static str, String)>,
        children: Vec<Element>,
    },
    Fragment(Vec<Element>),
    Component(Arc<dyn Component>),
    /// Context wrapper: children are rendered with `context` in scope
    Provider {
        context: SessionContext,
        children: Option<Box<Element>>,
    },
}

impl Element {
    pub fn text(text: impl Into<String>) -> Self {
        Element::Text(text.into())
    }

    pub fn node(tag: &'static str) -> Self {
        Element::Node {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn component(component: impl Component + 'static) -> Self {
        Element::Component(Arc::new(component))
    }

    /// Add an attribute. No-op on anything but `Node`.
    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        if let Element::Node { attrs, .. } = &mut self {
            attrs.push((name, value.into()));
        }
        self
    }

    /// Append a child. No-op on anything but `Node` and `Fragment`.
    pub fn child(mut self, child: Element) -> Self {
        match &mut self {
            Element::Node { children, .. } | Element::Fragment(children) => children.push(child),
            _ => {}
        }
        self
    }

    /// Render to HTML
    ///
    /// # Errors
    /// `MissingSessionContext` when a component is rendered outside a provider
    pub fn render_html(&self) -> Result<String, AppError> {
        let mut out = String::new();
        self.write_html(&mut out, None)?;
        Ok(out)
    }

    fn write_html(&self, out: &mut String, scope: Option<&SessionContext>) -> Result<(), AppError> {
        match self {
            Element::Text(text) => out.push_str(&html_escape::encode_text(text)),
            Element::Node {
                tag,
                attrs,
                children,
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(value));
                    out.push('"');
                }
                out.push('>');
                for child in children {
                    child.write_html(out, scope)?;
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            Element::Fragment(children) => {
                for child in children {
                    child.write_html(out, scope)?;
                }
            }
            Element::Component(component) => {
                let context = scope.ok_or(AppError::MissingSessionContext)?;
                component.render(context).write_html(out, scope)?;
            }
            // The wrapper itself emits no markup
            Element::Provider { context, children } => {
                if let Some(children) = children {
                    children.write_html(out, Some(context))?;
                }
            }
        }
        Ok(())
    }
}

impl PartialEq for Element {
    /// Structural equality; components compare by identity, provider
    /// contexts are not compared.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Element::Text(a), Element::Text(b)) => a == b,
            (
                Element::Node {
                    tag: tag_a,
                    attrs: attrs_a,
                    children: children_a,
                },
                Element::Node {
                    tag: tag_b,
                    attrs: attrs_b,
                    children: children_b,
                },
            ) => tag_a == tag_b && attrs_a == attrs_b && children_a == children_b,
            (Element::Fragment(a), Element::Fragment(b)) => a == b,
            (Element::Component(a), Element::Component(b)) => Arc::ptr_eq(a, b),
            (Element::Provider { children: a, .. }, Element::Provider { children: b, .. }) => {
                a == b
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Element::Node {
                tag,
                attrs,
                children,
            } => f
                .debug_struct("Node")
                .field("tag", tag)
                .field("attrs", attrs)
                .field("children", children)
                .finish(),
            Element::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
            Element::Component(_) => f.write_str("Component(..)"),
            Element::Provider { context, children } => f
                .debug_struct("Provider")
                .field("context", context)
                .field("children", children)
                .finish(),
        }
    }
}
