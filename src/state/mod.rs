//! Simulation state
//!
//! The [`State`] owns everything a functional or flux reads: the mesh, one
//! density [`Field`] per species, per-species physical properties, and the
//! simulation time. It is itself a versioned object: its token is composed
//! from the tokens of its fields and property map, so a functional that
//! captured the state token at its last compute can decide staleness with a
//! two-integer comparison no matter which field was touched.
//!
//! # Module Organization
//!
//! - [`field`]: per-species cell array with halo buffer
//! - [`mesh`]: 1D Cartesian mesh
//! - [`comm`]: halo exchange and collective reductions
//! - [`species`]: species-keyed maps with change tracking

mod comm;
mod field;
mod mesh;
mod species;

pub use comm::Communicator;
pub use field::Field;
pub use mesh::Mesh;
pub use species::SpeciesMap;

use crate::error::Result;
use crate::tracking::{DependencySet, ObjectId, Token, Tracker};

// =================================================================================================
// Species properties
// =================================================================================================

/// Physical parameters of one species.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeciesProperties {
    /// Hard-core diameter, used by excess free-energy models.
    pub diameter: f64,
    /// Ideal (thermal) volume entering the ideal-gas free energy and the
    /// grand-canonical normalization.
    pub volume: f64,
}

impl Default for SpeciesProperties {
    fn default() -> Self {
        Self {
            diameter: 1.0,
            volume: 1.0,
        }
    }
}

// =================================================================================================
// State
// =================================================================================================

/// Density fields, species parameters, and simulation time on a mesh.
#[derive(Debug)]
pub struct State {
    mesh: Mesh,
    comm: Communicator,
    species: Vec<String>,
    fields: SpeciesMap<Field>,
    properties: SpeciesMap<SpeciesProperties>,
    time: f64,
    tracker: Tracker,
    depends: DependencySet,
}

impl State {
    /// Create a state with one zero density field per species and default
    /// properties.
    pub fn new<S: AsRef<str>>(mesh: Mesh, species: &[S]) -> Self {
        let species: Vec<String> =
            species.iter().map(|s| s.as_ref().to_string()).collect();
        let mut fields = SpeciesMap::new();
        let mut properties = SpeciesMap::new();
        for s in &species {
            fields.insert(s.clone(), Field::new(mesh.shape()));
            properties.insert(s.clone(), SpeciesProperties::default());
        }
        Self {
            mesh,
            comm: Communicator::new(),
            species,
            fields,
            properties,
            time: 0.0,
            tracker: Tracker::new(),
            depends: DependencySet::new(),
        }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn communicator(&self) -> Communicator {
        self.comm
    }

    /// Species names, in construction order.
    pub fn species(&self) -> &[String] {
        &self.species
    }

    /// Density field for one species.
    pub fn field(&self, species: &str) -> Result<&Field> {
        self.fields.get(species)
    }

    /// Mutable density field for one species; writes stage both the field
    /// and (transitively) the state token.
    pub fn field_mut(&mut self, species: &str) -> Result<&mut Field> {
        self.fields.get_mut(species)
    }

    pub fn properties(&self, species: &str) -> Result<&SpeciesProperties> {
        self.properties.get(species)
    }

    pub fn set_properties(
        &mut self,
        species: &str,
        properties: SpeciesProperties,
    ) -> Result<()> {
        *self.properties.get_mut(species)? = properties;
        Ok(())
    }

    /// Ideal volume of one species.
    pub fn volume(&self, species: &str) -> Result<f64> {
        Ok(self.properties.get(species)?.volume)
    }

    pub fn set_volume(&mut self, species: &str, volume: f64) -> Result<()> {
        self.properties.get_mut(species)?.volume = volume;
        Ok(())
    }

    /// Hard-core diameter of one species.
    pub fn diameter(&self, species: &str) -> Result<f64> {
        Ok(self.properties.get(species)?.diameter)
    }

    pub fn set_diameter(&mut self, species: &str, diameter: f64) -> Result<()> {
        self.properties.get_mut(species)?.diameter = diameter;
        Ok(())
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
        self.tracker.stage();
    }

    /// Advance the simulation time by `timestep` (which may be negative).
    pub fn advance_time(&mut self, timestep: f64) {
        self.time += timestep;
        self.tracker.stage();
    }

    /// Grow the halo of one species' density field to at least `width`.
    ///
    /// A request that is already satisfied leaves every token untouched,
    /// so repeated setup passes do not invalidate caches.
    pub fn request_field_buffer(&mut self, species: &str, width: usize) -> Result<()> {
        if self.fields.get(species)?.buffer_shape() < width {
            self.fields.get_mut(species)?.request_buffer(width);
        }
        Ok(())
    }

    /// Halo-exchange every density field.
    pub fn sync_fields(&mut self) {
        let comm = self.comm;
        for field in self.fields.sync_iter_mut() {
            comm.sync(field);
        }
    }

    /// Resize a species map of fields to track this state's species set and
    /// mesh, honoring per-species halo requests.
    ///
    /// Entries for species the state does not carry are dropped; missing
    /// species are allocated; existing fields are reshaped to the mesh,
    /// keeping their current halo when no request is made. Fields that
    /// already match are left untouched, identity and token included.
    pub fn match_fields(&self, fields: &mut SpeciesMap<Field>, requests: &SpeciesMap<usize>) {
        let species = &self.species;
        fields.retain_keys(|s| species.iter().any(|t| t == s));
        for s in species {
            let request = requests.try_get(s).copied();
            if fields.contains(s) {
                if let Ok(field) = fields.get_mut(s) {
                    let buffer = request.unwrap_or(field.buffer_shape());
                    field.reshape(self.mesh.shape(), buffer);
                }
            } else {
                fields.insert(
                    s.clone(),
                    Field::with_buffer(self.mesh.shape(), request.unwrap_or(0)),
                );
            }
        }
    }

    /// Integral of one species' density over the domain, reduced across
    /// processes.
    pub fn integrate_density(&self, species: &str) -> Result<f64> {
        let local: f64 = self
            .field(species)?
            .owned()
            .iter()
            .map(|&rho| self.mesh.integrate(rho))
            .sum();
        Ok(self.comm.sum(local))
    }

    /// Copy field contents and time from another state of identical mesh
    /// and species set, staging tokens. Used to restore snapshots.
    ///
    /// # Panics
    ///
    /// Panics when the species sets or mesh differ; snapshots are always
    /// taken from the state they restore.
    pub fn assign(&mut self, other: &State) {
        assert_eq!(
            self.species, other.species,
            "cannot assign between states with different species"
        );
        assert_eq!(
            self.mesh, other.mesh,
            "cannot assign between states with different meshes"
        );
        for s in &self.species {
            // layouts may differ in halo width; match before copying
            if let (Ok(dst), Ok(src)) = (self.fields.get_mut(s), other.fields.get(s)) {
                dst.reshape(src.shape(), src.buffer_shape());
                dst.copy_from(src);
            }
        }
        self.time = other.time;
        self.tracker.stage();
    }

    pub fn id(&self) -> ObjectId {
        self.tracker.id()
    }

    /// Composed version token: any change to a density field or to the
    /// species properties stages the state token before it is committed and
    /// returned.
    pub fn token(&mut self) -> Token {
        let mut current = self.fields.field_tokens();
        current.push(self.fields.token());
        current.push(self.properties.token());
        if self.depends.changed(&current) {
            self.tracker.stage();
            self.depends.capture(&current);
        }
        self.tracker.token()
    }
}

impl Clone for State {
    /// Deep copy with fresh identity for the state and every field.
    fn clone(&self) -> Self {
        Self {
            mesh: self.mesh.clone(),
            comm: self.comm,
            species: self.species.clone(),
            fields: self.fields.clone(),
            properties: self.properties.clone(),
            time: self.time,
            tracker: Tracker::new(),
            depends: DependencySet::new(),
        }
    }
}

// =================================================================================================
// Tests
// =================================================================================================
