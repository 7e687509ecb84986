//! Interface descriptors
//!
//! An [`Interface`] is the method and property table registered once per
//! interface name and shared by every object implementing it. Handlers are
//! written against a typed context `&T`; the registry hands them the context
//! stored with each object registration.

use std::any::{type_name, Any};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use super::error::BusError;
use super::variant::Variant;

/// Per-object context stored by the registry
pub type Context = dyn Any + Send + Sync;

type MethodFn = Box<dyn Fn(&Context, &[Variant]) -> Result<Vec<Variant>, BusError> + Send + Sync>;
type GetterFn = Box<dyn Fn(&Context) -> Result<Variant, BusError> + Send + Sync>;
type SetterFn = Box<dyn Fn(&Context, Variant) -> Result<Variant, BusError> + Send + Sync>;

pub struct Method {
    name: String,
    in_signature: &'static str,
    out_signature: &'static str,
    handler: MethodFn,
}

impl Method {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn in_signature(&self) -> &'static str {
        self.in_signature
    }

    pub fn out_signature(&self) -> &'static str {
        self.out_signature
    }

    pub fn invoke(&self, context: &Context, args: &[Variant]) -> Result<Vec<Variant>, BusError> {
        (self.handler)(context, args)
    }
}

pub struct Property {
    name: String,
    signature: &'static str,
    getter: GetterFn,
    setter: Option<SetterFn>,
}

impl Property {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> &'static str {
        self.signature
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    pub fn get(&self, context: &Context) -> Result<Variant, BusError> {
        (self.getter)(context)
    }

    /// Apply a write and return the value it committed
    pub fn set(&self, context: &Context, value: Variant) -> Result<Variant, BusError> {
        match &self.setter {
            Some(setter) => setter(context, value),
            None => Err(BusError::PropertyReadOnly(self.name.clone())),
        }
    }
}

/// Method and property table for one interface name
pub struct Interface {
    name: String,
    methods: BTreeMap<String, Method>,
    properties: BTreeMap<String, Property>,
}

impl Interface {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.values()
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }
}

impl fmt::Debug for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interface")
            .field("name", &self.name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn bind<T: Any>(context: &Context) -> Result<&T, BusError> {
    context
        .downcast_ref::<T>()
        .ok_or_else(|| BusError::failed(format!("object context is not a {}", type_name::<T>())))
}

/// Typed builder for an [`Interface`] whose handlers receive `&T`
pub struct InterfaceBuilder<T> {
    name: String,
    methods: Vec<Method>,
    properties: Vec<Property>,
    _context: PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> InterfaceBuilder<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
            properties: Vec::new(),
            _context: PhantomData,
        }
    }

    pub fn method<F>(
        mut self,
        name: &str,
        in_signature: &'static str,
        out_signature: &'static str,
        handler: F,
    ) -> Self
    where
        F: Fn(&T, &[Variant]) -> Result<Vec<Variant>, BusError> + Send + Sync + 'static,
    {
        self.methods.push(Method {
            name: name.to_string(),
            in_signature,
            out_signature,
            handler: Box::new(move |context: &Context, args: &[Variant]| {
                handler(bind::<T>(context)?, args)
            }),
        });
        self
    }

    /// Read-only property
    pub fn property<G>(mut self, name: &str, signature: &'static str, getter: G) -> Self
    where
        G: Fn(&T) -> Result<Variant, BusError> + Send + Sync + 'static,
    {
        self.properties.push(Property {
            name: name.to_string(),
            signature,
            getter: Box::new(move |context: &Context| getter(bind::<T>(context)?)),
            setter: None,
        });
        self
    }

    /// Read-write property; `setter` returns the value it stored
    pub fn property_rw<G, S>(
        mut self,
        name: &str,
        signature: &'static str,
        getter: G,
        setter: S,
    ) -> Self
    where
        G: Fn(&T) -> Result<Variant, BusError> + Send + Sync + 'static,
        S: Fn(&T, Variant) -> Result<Variant, BusError> + Send + Sync + 'static,
    {
        self.properties.push(Property {
            name: name.to_string(),
            signature,
            getter: Box::new(move |context: &Context| getter(bind::<T>(context)?)),
            setter: Some(Box::new(move |context: &Context, value: Variant| {
                setter(bind::<T>(context)?, value)
            })),
        });
        self
    }

    /// Finish the table, rejecting duplicate member names
    pub fn build(self) -> Result<Interface, BusError> {
        if self.name.is_empty() || !self.name.contains('.') {
            return Err(BusError::InvalidInterface(format!(
                "'{}' is not a dotted interface name",
                self.name
            )));
        }

        let mut methods = BTreeMap::new();
        for method in self.methods {
            let name = method.name.clone();
            if methods.insert(name.clone(), method).is_some() {
                return Err(BusError::InvalidInterface(format!(
                    "{}: duplicate method '{}'",
                    self.name, name
                )));
            }
        }

        let mut properties = BTreeMap::new();
        for property in self.properties {
            let name = property.name.clone();
            if properties.insert(name.clone(), property).is_some() {
                return Err(BusError::InvalidInterface(format!(
                    "{}: duplicate property '{}'",
                    self.name, name
                )));
            }
        }

        Ok(Interface {
            name: self.name,
            methods,
            properties,
        })
    }
}
