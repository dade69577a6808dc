//! The glider trajectory schema: dimensions, variables and their attributes
//!
//! The registry is a read-only table built once per process. Both the writer
//! and the reader consult it; there is no way to register additional
//! variables at runtime.

use crate::attributes::{AttrValue, AttributeMap};
use crate::errors::{GliderError, Result};
use crate::units::{DEFAULT_CALENDAR, EPOCH_SECONDS_UNITS};
use std::sync::OnceLock;

/// Default NetCDF fill value for 64-bit floats.
pub const FILL_F64: f64 = 9.969_209_968_386_869e36;
/// Default NetCDF fill value for 16-bit integers.
pub const FILL_I16: i16 = -32_767;
/// Default NetCDF fill value for 8-bit integers.
pub const FILL_I8: i8 = -127;

/// Shared `flag_meanings` of every QC variable. Kept verbatim: it names eight
/// meanings for the ten codes in `flag_values`.
pub const QC_FLAG_MEANINGS: &str = "no_qc_performed good_data probably_good_data bad_data_that_are_potentially_correctable bad_data value_changed interpolated_value missing_value";

/// Inclusive QC code domain.
pub const QC_MIN: i8 = 0;
pub const QC_MAX: i8 = 9;

/// Schema revision recorded in `format_version`.
pub const FORMAT_VERSION: &str = "IOOS_Glider_NetCDF_Trajectory_Template_v0.0";

pub const DIM_TIME: &str = "time";
pub const DIM_TRAJECTORY: &str = "trajectory";
pub const DIM_TIME_UV: &str = "time_uv";

/// Element type of a stored variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    F64,
    I16,
    I8,
}

impl ElementType {
    pub const fn as_str(self) -> &'static str {
        match self {
            ElementType::F64 => "double",
            ElementType::I16 => "short",
            ElementType::I8 => "byte",
        }
    }
}

/// Typed fill sentinel attached as `_FillValue`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillValue {
    F64(f64),
    I16(i16),
    I8(i8),
}

impl FillValue {
    pub const fn for_type(element: ElementType) -> Self {
        match element {
            ElementType::F64 => FillValue::F64(FILL_F64),
            ElementType::I16 => FillValue::I16(FILL_I16),
            ElementType::I8 => FillValue::I8(FILL_I8),
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            FillValue::F64(v) => v,
            FillValue::I16(v) => f64::from(v),
            FillValue::I8(v) => f64::from(v),
        }
    }
}

/// How many trajectory columns a container carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One trajectory: observation variables are 1-D.
    Single,
    /// Several trajectories: observation variables are (record, trajectory).
    Multi(usize),
}

impl Layout {
    pub fn from_trajectory_count(count: usize) -> Result<Self> {
        match count {
            0 => Err(GliderError::shape(DIM_TRAJECTORY, 1, 0)),
            1 => Ok(Layout::Single),
            n => Ok(Layout::Multi(n)),
        }
    }

    pub const fn trajectory_count(self) -> usize {
        match self {
            Layout::Single => 1,
            Layout::Multi(n) => n,
        }
    }
}

/// Which dimension governs a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarClass {
    /// `time` and `time_qc`: always (time).
    TimeAxis,
    /// `time_uv`: always (time_uv).
    TimeUvAxis,
    /// `trajectory`: always (trajectory).
    TrajectoryAxis,
    /// Per-observation data: (time) or (time, trajectory).
    Observation,
    /// Depth-averaged current data: (time_uv) or (time_uv, trajectory).
    CurrentEstimate,
    /// Dimensionless container variables (`platform`, `instrument_ctd`).
    Descriptor,
}

impl VarClass {
    /// Dimension names for this class under `layout`.
    pub fn dims(self, layout: Layout) -> Vec<&'static str> {
        match (self, layout) {
            (VarClass::TimeAxis, _) => vec![DIM_TIME],
            (VarClass::TimeUvAxis, _) => vec![DIM_TIME_UV],
            (VarClass::TrajectoryAxis, _) => vec![DIM_TRAJECTORY],
            (VarClass::Observation, Layout::Single) => vec![DIM_TIME],
            (VarClass::Observation, Layout::Multi(_)) => vec![DIM_TIME, DIM_TRAJECTORY],
            (VarClass::CurrentEstimate, Layout::Single) => vec![DIM_TIME_UV],
            (VarClass::CurrentEstimate, Layout::Multi(_)) => vec![DIM_TIME_UV, DIM_TRAJECTORY],
            (VarClass::Descriptor, _) => Vec::new(),
        }
    }

    /// Name of the dimension that governs the leading axis, if any.
    pub const fn record_dimension(self) -> Option<&'static str> {
        match self {
            VarClass::TimeAxis | VarClass::Observation => Some(DIM_TIME),
            VarClass::TimeUvAxis | VarClass::CurrentEstimate => Some(DIM_TIME_UV),
            VarClass::TrajectoryAxis => Some(DIM_TRAJECTORY),
            VarClass::Descriptor => None,
        }
    }
}

/// One named dimension of the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionDescriptor {
    pub name: &'static str,
    pub unlimited: bool,
}

/// One named variable of the format.
#[derive(Debug, Clone)]
pub struct VariableDescriptor {
    pub name: &'static str,
    pub element_type: ElementType,
    pub class: VarClass,
    pub fill: Option<FillValue>,
    pub attributes: AttributeMap,
    /// Declared `valid_min`/`valid_max`, checked only by validation.
    pub valid_range: Option<(f64, f64)>,
    /// For a QC variable, the primary variable it flags.
    pub qc_of: Option<&'static str>,
}

impl VariableDescriptor {
    pub fn is_qc(&self) -> bool {
        self.qc_of.is_some()
    }
}

/// Process-wide, immutable schema table.
#[derive(Debug)]
pub struct SchemaRegistry {
    dimensions: Vec<DimensionDescriptor>,
    variables: Vec<VariableDescriptor>,
}

static REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();

impl SchemaRegistry {
    /// The shared registry, built on first use.
    pub fn global() -> &'static SchemaRegistry {
        REGISTRY.get_or_init(build_registry)
    }

    /// Dimensions in creation order: time, trajectory, time_uv.
    pub fn dimensions(&self) -> &[DimensionDescriptor] {
        &self.dimensions
    }

    /// Variables in write order.
    pub fn variables(&self) -> impl Iterator<Item = &VariableDescriptor> {
        self.variables.iter()
    }

    pub fn get(&self, name: &str) -> Option<&VariableDescriptor> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// QC variables in write order.
    pub fn qc_variables(&self) -> impl Iterator<Item = &VariableDescriptor> {
        self.variables.iter().filter(|v| v.is_qc())
    }
}

fn build_registry() -> SchemaRegistry {
    let dimensions = vec![
        DimensionDescriptor {
            name: DIM_TIME,
            unlimited: true,
        },
        DimensionDescriptor {
            name: DIM_TRAJECTORY,
            unlimited: false,
        },
        DimensionDescriptor {
            name: DIM_TIME_UV,
            unlimited: false,
        },
    ];

    let mut variables = Vec::with_capacity(30);

    variables.push(axis(
        "time",
        VarClass::TimeAxis,
        attrs([
            ("axis", "T".into()),
            ("calendar", DEFAULT_CALENDAR.into()),
            ("long_name", "Time".into()),
            ("observation_type", "measured".into()),
            ("sensor_name", "".into()),
            ("standard_name", "time".into()),
            ("units", EPOCH_SECONDS_UNITS.into()),
        ]),
        ElementType::F64,
    ));
    variables.push(qc("time_qc", "time", VarClass::TimeAxis));
    variables.push(axis(
        "time_uv",
        VarClass::TimeUvAxis,
        attrs([
            ("axis", "T".into()),
            ("calendar", DEFAULT_CALENDAR.into()),
            ("long_name", "Approximate time midpoint of each segment".into()),
            ("observation_type", "estimated".into()),
            ("standard_name", "time".into()),
            ("units", EPOCH_SECONDS_UNITS.into()),
        ]),
        ElementType::F64,
    ));
    variables.push(axis(
        "trajectory",
        VarClass::TrajectoryAxis,
        attrs([
            ("cf_role", "trajectory_id".into()),
            (
                "comment",
                "A trajectory can span multiple data files each containing a single segment.".into(),
            ),
            (
                "long_name",
                "Unique identifier for each trajectory feature contained in the file".into(),
            ),
        ]),
        ElementType::I16,
    ));
    variables.push(counter(
        "segment_id",
        "Segment ID",
        "Sequential segment number within a trajectory/deployment. A segment corresponds to the set of data collected between 2 gps fixes obtained when the glider surfaces.",
    ));
    variables.push(counter(
        "profile_id",
        "Profile ID",
        "Sequential profile number within the current segment. A profile is defined as a single dive or climb",
    ));

    let mut depth_attrs = attrs([
        ("ancillary_variables", "depth_qc".into()),
        ("axis", "Z".into()),
        ("instrument", "instrument_ctd".into()),
        ("long_name", "Depth".into()),
        ("observation_type", "calculated".into()),
        ("platform", "platform".into()),
        ("positive", "down".into()),
        ("reference_datum", "sea-surface".into()),
        ("sensor_name", "".into()),
        ("standard_name", "depth".into()),
        ("units", "meters".into()),
    ]);
    depth_attrs.insert("valid_min", 0.0);
    depth_attrs.insert("valid_max", 2000.0);
    variables.push(observation("depth", depth_attrs, (0.0, 2000.0)));
    variables.push(qc("depth_qc", "depth", VarClass::Observation));

    variables.push(observation(
        "lat",
        position("lat", "Y", "degrees_north", "latitude", "Latitude", (-90.0, 90.0)),
        (-90.0, 90.0),
    ));
    variables.push(qc("lat_qc", "lat", VarClass::Observation));
    variables.push(observation(
        "lon",
        position("lon", "X", "degrees_east", "longitude", "Longitude", (-180.0, 180.0)),
        (-180.0, 180.0),
    ));
    variables.push(qc("lon_qc", "lon", VarClass::Observation));

    let mut pressure_attrs = attrs([
        ("accuracy", "".into()),
        ("ancillary_variables", "pressure_qc".into()),
        ("axis", "Z".into()),
        ("instrument", "instrument_ctd".into()),
        ("long_name", "Pressure".into()),
        ("observation_type", "calculated".into()),
        ("platform", "platform".into()),
        ("positive", "down".into()),
        ("precision", "".into()),
        ("reference_datum", "sea-surface".into()),
        ("resolution", "".into()),
        ("sensor_name", "".into()),
        ("standard_name", "pressure".into()),
        ("units", "dbar".into()),
    ]);
    pressure_attrs.insert("valid_min", 0.0);
    pressure_attrs.insert("valid_max", 2000.0);
    variables.push(observation("pressure", pressure_attrs, (0.0, 2000.0)));
    variables.push(qc("pressure_qc", "pressure", VarClass::Observation));

    let mut conductivity_attrs = ctd(
        "conductivity",
        "sea_water_electrical_conductivity",
        "S m-1",
        "Conductivity",
        "measured",
        (0.0, 10.0),
    );
    with_sensor_precision(&mut conductivity_attrs);
    variables.push(observation("conductivity", conductivity_attrs, (0.0, 10.0)));
    variables.push(qc("conductivity_qc", "conductivity", VarClass::Observation));

    variables.push(observation(
        "density",
        ctd(
            "density",
            "sea_water_density",
            "kg m-3",
            "Density",
            "calculated",
            (1015.0, 1040.0),
        ),
        (1015.0, 1040.0),
    ));
    variables.push(qc("density_qc", "density", VarClass::Observation));

    variables.push(observation(
        "salinity",
        ctd(
            "salinity",
            "sea_water_salinity",
            "1e-3",
            "Salinity",
            "calculated",
            (0.0, 40.0),
        ),
        (0.0, 40.0),
    ));
    variables.push(qc("salinity_qc", "salinity", VarClass::Observation));

    let mut temperature_attrs = ctd(
        "temperature",
        "sea_water_temperature",
        "Celsius",
        "Temperature",
        "measured",
        (-5.0, 40.0),
    );
    with_sensor_precision(&mut temperature_attrs);
    variables.push(observation("temperature", temperature_attrs, (-5.0, 40.0)));
    variables.push(qc("temperature_qc", "temperature", VarClass::Observation));

    variables.push(current(
        "lat_uv",
        current_position("Y", "degrees_north", "latitude", "Latitude", "latitude", (-90.0, 90.0)),
        (-90.0, 90.0),
    ));
    variables.push(current(
        "lon_uv",
        current_position("X", "degrees_east", "longitude", "Longitude", "longitude", (-180.0, 180.0)),
        (-180.0, 180.0),
    ));
    variables.push(current(
        "u",
        velocity("eastward_sea_water_velocity", "Eastward Sea Water Velocity"),
        (-10.0, 10.0),
    ));
    variables.push(qc("u_qc", "u", VarClass::CurrentEstimate));
    variables.push(current(
        "v",
        velocity("northward_sea_water_velocity", "Northward Sea Water Velocity"),
        (-10.0, 10.0),
    ));
    variables.push(qc("v_qc", "v", VarClass::CurrentEstimate));

    variables.push(descriptor("platform", platform_attributes()));
    variables.push(descriptor("instrument_ctd", instrument_attributes()));

    SchemaRegistry {
        dimensions,
        variables,
    }
}

/// Default attributes of the `platform` descriptor variable.
pub fn platform_attributes() -> AttributeMap {
    attrs([
        ("comment", "Slocum Glider ru29".into()),
        ("id", "ru29".into()),
        ("instrument", "instrument_ctd".into()),
        ("long_name", "Slocum Glider ru29".into()),
        ("type", "platform".into()),
        ("wmo_id", "ru29".into()),
    ])
}

/// Default attributes of the `instrument_ctd` descriptor variable.
pub fn instrument_attributes() -> AttributeMap {
    attrs([
        ("calibration_date", "2000-01-01".into()),
        ("calibration_report", "".into()),
        ("comment", "Slocum Glider ru29".into()),
        ("factory_calibrated", "".into()),
        (
            "long_name",
            "Seabird SBD 41CP Conductivity, Temperature, Depth Sensor".into(),
        ),
        ("make_model", "Seabird SBE 41CP".into()),
        ("platform", "platform".into()),
        ("serial_number", "0098".into()),
        ("user_calibrated", "".into()),
    ])
}

fn attrs<const N: usize>(entries: [(&str, AttrValue); N]) -> AttributeMap {
    entries.into_iter().collect()
}

fn axis(
    name: &'static str,
    class: VarClass,
    attributes: AttributeMap,
    element_type: ElementType,
) -> VariableDescriptor {
    VariableDescriptor {
        name,
        element_type,
        class,
        fill: None,
        attributes,
        valid_range: None,
        qc_of: None,
    }
}

fn counter(name: &'static str, long_name: &str, comment: &str) -> VariableDescriptor {
    let mut attributes = attrs([
        ("comment", comment.into()),
        ("long_name", long_name.into()),
        ("observation_type", "calculated".into()),
    ]);
    attributes.insert("valid_min", 1i16);
    attributes.insert("valid_max", 999i16);
    VariableDescriptor {
        name,
        element_type: ElementType::I16,
        class: VarClass::Observation,
        fill: Some(FillValue::for_type(ElementType::I16)),
        attributes,
        valid_range: Some((1.0, 999.0)),
        qc_of: None,
    }
}

fn observation(name: &'static str, attributes: AttributeMap, range: (f64, f64)) -> VariableDescriptor {
    VariableDescriptor {
        name,
        element_type: ElementType::F64,
        class: VarClass::Observation,
        fill: Some(FillValue::for_type(ElementType::F64)),
        attributes,
        valid_range: Some(range),
        qc_of: None,
    }
}

fn current(name: &'static str, attributes: AttributeMap, range: (f64, f64)) -> VariableDescriptor {
    VariableDescriptor {
        class: VarClass::CurrentEstimate,
        ..observation(name, attributes, range)
    }
}

fn qc(name: &'static str, primary: &'static str, class: VarClass) -> VariableDescriptor {
    let mut attributes = attrs([
        ("flag_meanings", QC_FLAG_MEANINGS.into()),
        ("long_name", format!("{} Quality Flag", primary).into()),
        ("standard_name", format!("{} status_flag", primary).into()),
    ]);
    attributes.insert("flag_values", (QC_MIN..=QC_MAX).collect::<Vec<i8>>());
    attributes.insert("valid_min", QC_MIN);
    attributes.insert("valid_max", QC_MAX);

    VariableDescriptor {
        name,
        element_type: ElementType::I8,
        class,
        fill: Some(FillValue::for_type(ElementType::I8)),
        attributes,
        valid_range: Some((f64::from(QC_MIN), f64::from(QC_MAX))),
        qc_of: Some(primary),
    }
}

fn descriptor(name: &'static str, attributes: AttributeMap) -> VariableDescriptor {
    VariableDescriptor {
        name,
        element_type: ElementType::I8,
        class: VarClass::Descriptor,
        fill: None,
        attributes,
        valid_range: None,
        qc_of: None,
    }
}

fn position(
    name: &str,
    axis: &str,
    units: &str,
    standard_name: &str,
    long_name: &str,
    range: (f64, f64),
) -> AttributeMap {
    let mut attributes = attrs([
        ("ancillary_variables", format!("{}_qc", name).into()),
        ("axis", axis.into()),
        (
            "comment",
            format!(
                "Some values are linearly interpolated between measured coordinates.  See {}_qc",
                name
            )
            .into(),
        ),
        ("coordinate_reference_frame", "urn:ogc:crs:EPSG::4326".into()),
        ("flag_meanings", "".into()),
        ("long_name", long_name.into()),
        ("observation_type", "measured".into()),
        ("platform", "platform".into()),
        ("reference", "WGS84".into()),
        ("sensor_name", "".into()),
        ("standard_name", standard_name.into()),
        ("units", units.into()),
    ]);
    attributes.insert("valid_min", range.0);
    attributes.insert("valid_max", range.1);
    attributes
}

fn current_position(
    axis: &str,
    units: &str,
    standard_name: &str,
    label: &str,
    noun: &str,
    range: (f64, f64),
) -> AttributeMap {
    let mut attributes = attrs([
        ("axis", axis.into()),
        (
            "comment",
            format!(
                "Values are interpolated to provide the center {} of the segment",
                noun
            )
            .into(),
        ),
        ("coordinates", "lon_uv lat_uv time_uv".into()),
        (
            "long_name",
            format!("Center {} for Depth-Averaged Current", label).into(),
        ),
        ("observation_type", "calculated".into()),
        ("platform", "platform".into()),
        ("standard_name", standard_name.into()),
        ("units", units.into()),
    ]);
    attributes.insert("valid_min", range.0);
    attributes.insert("valid_max", range.1);
    attributes
}

fn velocity(standard_name: &str, long_name: &str) -> AttributeMap {
    let mut attributes = attrs([
        ("coordinates", "lon_uv lat_uv time_uv".into()),
        ("long_name", long_name.into()),
        ("observation_type", "calculated".into()),
        ("platform", "platform".into()),
        ("sensor_name", "".into()),
        ("standard_name", standard_name.into()),
        ("units", "m s-1".into()),
    ]);
    attributes.insert("valid_min", -10.0);
    attributes.insert("valid_max", 10.0);
    attributes
}

fn ctd(
    name: &str,
    standard_name: &str,
    units: &str,
    long_name: &str,
    observation_type: &str,
    range: (f64, f64),
) -> AttributeMap {
    let mut attributes = attrs([
        ("ancillary_variables", format!("{}_qc", name).into()),
        ("coordinates", "lon lat depth time".into()),
        ("instrument", "instrument_ctd".into()),
        ("long_name", long_name.into()),
        ("observation_type", observation_type.into()),
        ("platform", "platform".into()),
        ("sensor_name", "".into()),
        ("standard_name", standard_name.into()),
        ("units", units.into()),
    ]);
    attributes.insert("valid_min", range.0);
    attributes.insert("valid_max", range.1);
    attributes
}

fn with_sensor_precision(attributes: &mut AttributeMap) {
    for key in ["accuracy", "precision", "resolution"] {
        attributes.insert(key, "");
    }
}
