//! Startup discovery of action units and tool specs.
//!
//! Units are not found by scanning the filesystem. Every contributing module
//! submits a [`UnitRegistration`] or [`ToolSpecBundle`] at link time, tagged
//! with the *location* it belongs to. The [`DiscoveryLoader`] then visits
//! configured locations in order, exactly like a search path.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::action::{Action, ActionResult};
use crate::registry::ActionRegistry;
use crate::tool_spec::ToolSpec;

/// Zero-argument constructor for a discoverable unit.
pub type UnitFactory = Arc<dyn Fn() -> ActionResult<Box<dyn Action>> + Send + Sync>;

/// Producer of a module-level list of pre-built tool specs.
pub type ToolSpecProvider = Arc<dyn Fn() -> Vec<ToolSpec> + Send + Sync>;

/// Link-time registration of a unit factory, emitted by `#[action_unit]`.
pub struct UnitRegistration {
    /// Location the unit belongs to.
    pub location: &'static str,
    /// Module path of the contributing type.
    pub module: &'static str,
    /// Constructor invoked during discovery.
    pub factory: fn() -> ActionResult<Box<dyn Action>>,
}

inventory::collect!(UnitRegistration);

/// Link-time registration of pre-built tool specs, emitted by
/// [`submit_tool_specs!`](crate::submit_tool_specs).
pub struct ToolSpecBundle {
    /// Location the bundle belongs to.
    pub location: &'static str,
    /// Module path of the contributing module.
    pub module: &'static str,
    /// Producer of the tool specs.
    pub provider: fn() -> Vec<ToolSpec>,
}

inventory::collect!(ToolSpecBundle);

/// Submits a module-level list of tool specs for discovery.
///
/// ```ignore
/// action_registry::submit_tool_specs!("plugins", || vec![ToolSpec::new("dig", "Dig")]);
/// ```
#[macro_export]
macro_rules! submit_tool_specs {
    ($location:expr, $provider:expr) => {
        $crate::__private::inventory::submit! {
            $crate::ToolSpecBundle {
                location: $location,
                module: ::core::module_path!(),
                provider: $provider,
            }
        }
    };
}

/// Value exported by a catalog module.
#[derive(Clone)]
pub enum Export {
    /// Constructible action unit.
    Unit(UnitFactory),
    /// Pre-built tool specs that bypass unit construction.
    ToolSpecs(ToolSpecProvider),
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit(_) => f.write_str("Export::Unit"),
            Self::ToolSpecs(_) => f.write_str("Export::ToolSpecs"),
        }
    }
}

#[derive(Clone, Debug)]
struct ModuleEntry {
    module: String,
    export: Export,
}

/// Candidate locations and the modules each one contributes.
#[derive(Clone, Debug, Default)]
pub struct ActionCatalog {
    locations: BTreeMap<String, Vec<ModuleEntry>>,
}

impl ActionCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the catalog from every link-time submission in the binary.
    ///
    /// Modules within a location are ordered by module path so discovery does
    /// not depend on link order.
    #[must_use]
    pub fn from_inventory() -> Self {
        let mut catalog = Self::new();
        for registration in inventory::iter::<UnitRegistration> {
            let factory = registration.factory;
            catalog.push(
                registration.location,
                registration.module,
                Export::Unit(Arc::new(factory)),
            );
        }
        for bundle in inventory::iter::<ToolSpecBundle> {
            let provider = bundle.provider;
            catalog.push(bundle.location, bundle.module, Export::ToolSpecs(Arc::new(provider)));
        }
        for modules in catalog.locations.values_mut() {
            modules.sort_by(|a, b| a.module.cmp(&b.module));
        }
        catalog
    }

    /// Adds a unit factory to a location.
    #[must_use]
    pub fn with_unit<F>(mut self, location: &str, module: &str, factory: F) -> Self
    where
        F: Fn() -> ActionResult<Box<dyn Action>> + Send + Sync + 'static,
    {
        self.push(location, module, Export::Unit(Arc::new(factory)));
        self
    }

    /// Adds a module-level tool spec list to a location.
    #[must_use]
    pub fn with_tool_specs<F>(mut self, location: &str, module: &str, provider: F) -> Self
    where
        F: Fn() -> Vec<ToolSpec> + Send + Sync + 'static,
    {
        self.push(location, module, Export::ToolSpecs(Arc::new(provider)));
        self
    }

    /// Returns `true` when the location contributes at least one module.
    #[must_use]
    pub fn has_location(&self, location: &str) -> bool {
        self.locations.contains_key(location)
    }

    /// Returns the known location names.
    #[must_use]
    pub fn locations(&self) -> Vec<&str> {
        self.locations.keys().map(String::as_str).collect()
    }

    fn push(&mut self, location: &str, module: &str, export: Export) {
        self.locations
            .entry(location.to_owned())
            .or_default()
            .push(ModuleEntry {
                module: module.to_owned(),
                export,
            });
    }

    fn modules(&self, location: &str) -> &[ModuleEntry] {
        self.locations.get(location).map_or(&[], Vec::as_slice)
    }
}

/// Unit skipped because its name was already registered.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SkippedDuplicate {
    /// Name of the unit.
    pub name: String,
    /// Location the skipped unit came from.
    pub location: String,
}

/// Unit or spec bundle that could not be loaded.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct LoadFailure {
    /// Location being scanned.
    pub location: String,
    /// Module that failed.
    pub module: String,
    /// Human-readable reason.
    pub reason: String,
}

/// Summary of what a discovery pass did.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DiscoveryReport {
    /// Locations actually visited, in order.
    pub scanned: Vec<String>,
    /// Names registered by this pass.
    pub registered: Vec<String>,
    /// Units skipped because their name was taken.
    pub duplicates: Vec<SkippedDuplicate>,
    /// Units that failed to construct and malformed spec entries.
    pub failures: Vec<LoadFailure>,
    /// Location after which scanning stopped because it produced tool specs.
    pub stopped_after: Option<String>,
}

/// Immutable result of a discovery pass.
#[derive(Debug, Default)]
pub struct DiscoverySnapshot {
    tool_specs: Vec<ToolSpec>,
    report: DiscoveryReport,
}

impl DiscoverySnapshot {
    /// Creates a snapshot from pre-built tool specs, bypassing discovery.
    #[must_use]
    pub fn from_tool_specs(tool_specs: Vec<ToolSpec>) -> Self {
        Self {
            tool_specs,
            report: DiscoveryReport::default(),
        }
    }

    /// Returns the collected tool specs in discovery order.
    #[must_use]
    pub fn tool_specs(&self) -> &[ToolSpec] {
        &self.tool_specs
    }

    /// Returns the pass summary.
    #[must_use]
    pub fn report(&self) -> &DiscoveryReport {
        &self.report
    }
}

/// Walks catalog locations in order, registering units and collecting specs.
///
/// Scanning stops at the first location that yields at least one tool spec;
/// later locations are not consulted. Units from a location that yields no
/// specs are still registered before moving on. Specs of duplicate units are
/// kept and bound to the name already in the registry.
pub struct DiscoveryLoader {
    locations: Vec<String>,
    catalog: ActionCatalog,
    last: RwLock<Option<Arc<DiscoverySnapshot>>>,
}

impl fmt::Debug for DiscoveryLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryLoader")
            .field("locations", &self.locations)
            .field("catalog", &self.catalog.locations())
            .finish_non_exhaustive()
    }
}

impl DiscoveryLoader {
    /// Creates a loader over the link-time catalog.
    #[must_use]
    pub fn new<I, S>(locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_catalog(locations, ActionCatalog::from_inventory())
    }

    /// Creates a loader over an explicit catalog.
    #[must_use]
    pub fn with_catalog<I, S>(locations: I, catalog: ActionCatalog) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            locations: locations.into_iter().map(Into::into).collect(),
            catalog,
            last: RwLock::new(None),
        }
    }

    /// Returns the configured locations in scan order.
    #[must_use]
    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    /// Runs a discovery pass against `registry`.
    ///
    /// Construction failures and malformed spec entries are logged and
    /// skipped; they never abort the pass.
    ///
    /// # Panics
    ///
    /// Panics if the snapshot lock is poisoned.
    pub fn discover(&self, registry: &ActionRegistry) -> Arc<DiscoverySnapshot> {
        let mut tool_specs = Vec::new();
        let mut report = DiscoveryReport::default();

        for location in &self.locations {
            if !self.catalog.has_location(location) {
                debug!(location = %location, "discovery location not present, skipping");
                continue;
            }

            report.scanned.push(location.clone());
            let found = self.scan_location(location, registry, &mut report);
            let yielded = !found.is_empty();
            tool_specs.extend(found);

            if yielded {
                report.stopped_after = Some(location.clone());
                break;
            }
        }

        info!(
            scanned = ?report.scanned,
            registered = report.registered.len(),
            duplicates = report.duplicates.len(),
            failures = report.failures.len(),
            tool_specs = tool_specs.len(),
            "action discovery finished"
        );

        let snapshot = Arc::new(DiscoverySnapshot { tool_specs, report });
        *self.last.write().expect("discovery snapshot poisoned") = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// Returns the snapshot computed by the last [`discover`](Self::discover) call.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<DiscoverySnapshot>> {
        self.last.read().ok()?.clone()
    }

    fn scan_location(
        &self,
        location: &str,
        registry: &ActionRegistry,
        report: &mut DiscoveryReport,
    ) -> Vec<ToolSpec> {
        let mut specs = Vec::new();

        for entry in self.catalog.modules(location) {
            match &entry.export {
                Export::Unit(factory) => {
                    let unit = match factory() {
                        Ok(unit) => Arc::<dyn Action>::from(unit),
                        Err(err) => {
                            warn!(location, module = %entry.module, error = %err, "failed to instantiate action unit");
                            report.failures.push(LoadFailure {
                                location: location.to_owned(),
                                module: entry.module.clone(),
                                reason: err.to_string(),
                            });
                            continue;
                        }
                    };

                    let name = unit.name().to_owned();
                    let unit_specs = unit.tool_specs();
                    specs.extend(unit_specs.into_iter().map(|spec| spec.default_action(&name)));

                    if registry.register_if_absent(unit) {
                        report.registered.push(name);
                    } else {
                        debug!(location, action = %name, "action already registered, skipping");
                        report.duplicates.push(SkippedDuplicate {
                            name,
                            location: location.to_owned(),
                        });
                    }
                }
                Export::ToolSpecs(provider) => {
                    for spec in provider() {
                        if spec.is_well_formed() {
                            specs.push(spec);
                        } else {
                            warn!(location, module = %entry.module, tool = spec.tool_name(), "dropping malformed tool spec");
                            report.failures.push(LoadFailure {
                                location: location.to_owned(),
                                module: entry.module.clone(),
                                reason: "tool spec requires a name and description".into(),
                            });
                        }
                    }
                }
            }
        }

        specs
    }
}
