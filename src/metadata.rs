//! Container inspection and variable description
//!
//! This module provides the human-readable summaries printed by the
//! `inspect` and `describe` commands.

use crate::attributes::AttributeMap;
use crate::errors::Result;
use crate::reader::{ContainerReader, DimensionInfo};
use crate::schema::SchemaRegistry;

/// Structured metadata for a container variable
#[derive(Debug, Clone)]
pub struct VariableMetadata {
    pub name: String,
    pub data_type: String,
    pub dimensions: Vec<DimensionInfo>,
    pub attributes: AttributeMap,
    pub total_elements: usize,
    pub estimated_size_bytes: usize,
    /// False for variables the glider format does not define.
    pub in_schema: bool,
}

/// Get structured metadata for a variable
pub fn get_variable_metadata(reader: &ContainerReader, var_name: &str) -> Result<VariableMetadata> {
    let data_type = reader.variable_type(var_name)?;
    let dimensions = reader.variable_dimensions(var_name)?;
    let attributes = reader.variable_attributes(var_name)?;

    let total_elements: usize = dimensions.iter().map(|d| d.length).product();
    let estimated_size_bytes = total_elements * element_size(&data_type);

    Ok(VariableMetadata {
        name: var_name.to_string(),
        data_type,
        dimensions,
        attributes,
        total_elements,
        estimated_size_bytes,
        in_schema: SchemaRegistry::global().get(var_name).is_some(),
    })
}

/// Prints dimensions, key global attributes and variables of a container.
pub fn print_summary(reader: &ContainerReader) -> Result<()> {
    println!("\n Container: {}", reader.path().display());
    println!("   Time variable: {}", reader.time_variable());

    println!("\n Dimensions");
    println!("==============");
    let dimensions = reader.dimensions();
    if dimensions.is_empty() {
        println!("   (No dimensions found)");
    }
    for dim in &dimensions {
        println!("    {} = {}", dim.name, length_label(dim));
    }

    let attributes = reader.attributes()?;
    println!("\n Global Attributes ({})", attributes.len());
    println!("=======================");
    for key in [
        "title",
        "id",
        "format_version",
        "time_coverage_start",
        "time_coverage_end",
        "geospatial_lat_min",
        "geospatial_lat_max",
        "geospatial_lon_min",
        "geospatial_lon_max",
    ] {
        if let Some(value) = attributes.get(key) {
            println!("    {}: {}", key, value);
        }
    }

    println!("\n Variables");
    println!("=============");
    for name in reader.variable_names() {
        let meta = get_variable_metadata(reader, &name)?;
        let dims: Vec<&str> = meta.dimensions.iter().map(|d| d.name.as_str()).collect();
        let marker = if meta.in_schema { "" } else { " (not in format)" };
        if dims.is_empty() {
            println!("    {} ({}): scalar{}", meta.name, meta.data_type, marker);
        } else {
            println!(
                "    {} ({}): [{}] = ({}){}",
                meta.name,
                meta.data_type,
                dims.join(", "),
                shape_label(&meta.dimensions),
                marker
            );
        }

        let mut key_attrs = Vec::new();
        for key in ["units", "long_name", "_FillValue"] {
            if let Some(value) = meta.attributes.get(key) {
                key_attrs.push(format!("{}: {}", key, value));
            }
        }
        if !key_attrs.is_empty() {
            println!("      - {}", key_attrs.join(", "));
        }
    }

    Ok(())
}

/// Describes a specific variable showing its data type, shape, and all attributes.
pub fn describe_variable(reader: &ContainerReader, var_name: &str) -> Result<()> {
    let meta = get_variable_metadata(reader, var_name)?;

    println!("\n Variable Description: {}", var_name);
    println!("={}", "=".repeat(var_name.len() + 25));
    println!(" Data type: {}", meta.data_type);

    if meta.dimensions.is_empty() {
        println!(" Dimensions: (scalar)");
        println!(" Shape: ()");
    } else {
        let dims: Vec<&str> = meta.dimensions.iter().map(|d| d.name.as_str()).collect();
        println!(" Dimensions: [{}]", dims.join(", "));
        println!(" Shape: ({})", shape_label(&meta.dimensions));

        println!("\n Dimension Details:");
        for dim in &meta.dimensions {
            println!("    {} = {}", dim.name, length_label(dim));
        }
    }

    if let Some(descriptor) = SchemaRegistry::global().get(var_name) {
        println!("\n Format Definition:");
        println!("    Element type: {}", descriptor.element_type.as_str());
        if let Some((min, max)) = descriptor.valid_range {
            println!("    Declared range: [{}, {}]", min, max);
        }
        if let Some(primary) = descriptor.qc_of {
            println!("    Quality flags for: {}", primary);
        }
    }

    if meta.attributes.is_empty() {
        println!("\n  Attributes: (none)");
    } else {
        println!("\n  Attributes:");
        for (key, value) in &meta.attributes {
            println!("   - {}: {}", key, value);
        }
    }

    println!("\n Storage Information:");
    println!("    Total elements: {}", meta.total_elements);
    println!("    Element size: {} bytes", element_size(&meta.data_type));
    println!("    Total size: {}", format_size(meta.estimated_size_bytes));

    Ok(())
}

fn length_label(dim: &DimensionInfo) -> String {
    if dim.is_unlimited {
        format!("{} (unlimited)", dim.length)
    } else {
        dim.length.to_string()
    }
}

fn shape_label(dimensions: &[DimensionInfo]) -> String {
    dimensions
        .iter()
        .map(|d| d.length.to_string())
        .collect::<Vec<_>>()
        .join(" x ")
}

/// Element size in bytes for a lowercased NetCDF type name.
fn element_size(data_type: &str) -> usize {
    if data_type.contains("double") || data_type.contains("f64") || data_type.contains("i64") || data_type.contains("u64") {
        8
    } else if data_type.contains("short") || data_type.contains("i16") || data_type.contains("u16") {
        2
    } else if data_type.contains("byte") || data_type.contains("char") || data_type.contains("i8") || data_type.contains("u8") {
        1
    } else {
        4
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: usize) -> String {
    let bytes_f = bytes as f64;
    if bytes < 1024 {
        format!("{} bytes", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.2} KB", bytes_f / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.2} MB", bytes_f / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes_f / (1024.0 * 1024.0 * 1024.0))
    }
}
