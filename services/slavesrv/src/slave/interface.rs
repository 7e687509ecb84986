//! `Slave1` remote interface
//!
//! Methods `AddSource(a{sv}) -> o` and `RemoveSource(o)`, properties
//! `Id: y` (read-only) and `Name: s` (read-write).

use std::sync::Arc;

use tracing::{debug, warn};

use super::entity::Slave;
use crate::bus::{BusError, Interface, InterfaceBuilder, ObjectPath, Variant};
use crate::source::{SourceDefinition, SourceManager};

pub const SLAVE_INTERFACE: &str = "br.org.cesar.modbus.Slave1";

/// Build the interface table, with source methods bound to `sources`
pub fn build(sources: Arc<dyn SourceManager>) -> Result<Interface, BusError> {
    let add_sources = Arc::clone(&sources);
    let remove_sources = sources;

    InterfaceBuilder::<Slave>::new(SLAVE_INTERFACE)
        .method("AddSource", "a{sv}", "o", move |slave, args| {
            add_source(slave, add_sources.as_ref(), args)
        })
        .method("RemoveSource", "o", "", move |slave, args| {
            remove_source(slave, remove_sources.as_ref(), args)
        })
        .property("Id", "y", |slave| Ok(Variant::Byte(slave.id())))
        .property_rw(
            "Name",
            "s",
            |slave| Ok(Variant::Str(slave.name())),
            set_name,
        )
        .build()
}

/// Validate an `AddSource` dictionary without side effects
pub fn parse_source_definition(args: &[Variant]) -> Result<SourceDefinition, BusError> {
    let dict = match args {
        [arg] => arg.as_dict(),
        _ => None,
    }
    .ok_or_else(|| BusError::invalid_args("expected a single a{sv} argument"))?;

    let mut name = None;
    let mut kind = None;
    let mut address = 0u16;
    let mut size = 0u16;

    for (key, value) in dict {
        match (key.as_str(), value) {
            ("Name", Variant::Str(v)) => name = Some(v.clone()),
            ("Type", Variant::Str(v)) => kind = Some(v.clone()),
            ("Address", Variant::UInt16(v)) => address = *v,
            ("Size", Variant::UInt16(v)) => size = *v,
            ("Name" | "Type" | "Address" | "Size", other) => {
                return Err(BusError::invalid_args(format!(
                    "'{}' has type {}",
                    key,
                    other.signature()
                )))
            },
            _ => return Err(BusError::invalid_args(format!("unknown key '{}'", key))),
        }
    }

    // TODO: validate `Type` against the supported register kinds
    match (name, kind) {
        (Some(name), Some(kind)) if !name.is_empty() && !kind.is_empty() && address != 0 && size != 0 => {
            Ok(SourceDefinition {
                name,
                kind,
                address,
                size,
            })
        },
        _ => Err(BusError::invalid_args(
            "Name, Type, Address and Size are required and must be non-zero",
        )),
    }
}

fn add_source(
    slave: &Slave,
    sources: &dyn SourceManager,
    args: &[Variant],
) -> Result<Vec<Variant>, BusError> {
    let definition = parse_source_definition(args)?;

    match sources.create(slave.path(), &definition) {
        Ok(path) => Ok(vec![Variant::ObjectPath(path)]),
        Err(e) => {
            warn!("AddSource on {} rejected: {}", slave.path(), e);
            Err(BusError::invalid_args(e.to_string()))
        },
    }
}

fn remove_source(
    slave: &Slave,
    sources: &dyn SourceManager,
    args: &[Variant],
) -> Result<Vec<Variant>, BusError> {
    let path: &ObjectPath = match args {
        [Variant::ObjectPath(path)] => path,
        _ => return Err(BusError::invalid_args("expected a single object path argument")),
    };

    if !path.is_descendant_of(slave.path()) {
        return Err(BusError::invalid_args(format!(
            "{} is not a source of {}",
            path,
            slave.path()
        )));
    }

    sources.remove(path).map_err(|e| {
        warn!("RemoveSource on {} rejected: {}", slave.path(), e);
        BusError::invalid_args(e.to_string())
    })?;
    Ok(vec![])
}

fn set_name(slave: &Slave, value: Variant) -> Result<Variant, BusError> {
    match value {
        Variant::Str(name) => {
            let previous = slave.set_name(name.clone());
            debug!("{} Name: {:?} -> {:?}", slave.path(), previous, name);
            Ok(Variant::Str(name))
        },
        other => Err(BusError::invalid_args(format!(
            "Name expects s, got {}",
            other.signature()
        ))),
    }
}
