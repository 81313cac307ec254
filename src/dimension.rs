//! Dimension (spec §4.3): a named grouping of variables by role within a
//! dataset.
//!
//! Role entries are stored in a `Vec<(String, Rc<Variable>)>` rather than a
//! `HashMap`, matching the teacher's preference for small linear-scan
//! stores over a generic map when the cardinality is bounded (`WriteBuffer`'s
//! edge `Vec` in `storage_v2/write_buffer.rs` is the same shape: lookup by
//! scan is fine because the table never grows past a handful of entries).

use std::rc::Rc;

use crate::error::{DasError, Result};
use crate::shape::DimLen;
use crate::variable::{merge_shapes, Variable};

/// Maximum number of role entries a dimension may carry (spec §4.3).
pub const MAX_ROLES: usize = 16;

/// Maximum number of plot-axis affinity tags a dimension may carry.
pub const MAX_PLOT_AXES: usize = 4;

/// The point-variable role lookup order used by `get_point_var`.
const POINT_ROLE_PRIORITY: [&str; 4] = ["center", "mean", "median", "mode"];

/// A named grouping of variables by role within a [`crate::dataset::Dataset`]
/// (spec §4.3).
pub struct Dimension {
    name: String,
    category: String,
    roles: Vec<(String, Rc<Variable>)>,
    plot_axes: Vec<String>,
    vector_frame: Option<String>,
}

impl Dimension {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Dimension {
            name: name.into(),
            category: category.into(),
            roles: Vec::new(),
            plot_axes: Vec::new(),
            vector_frame: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn vector_frame(&self) -> Option<&str> {
        self.vector_frame.as_deref()
    }

    pub fn set_vector_frame(&mut self, frame: impl Into<String>) {
        self.vector_frame = Some(frame.into());
    }

    pub fn plot_axes(&self) -> &[String] {
        &self.plot_axes
    }

    /// Add a plot-axis affinity tag. Errors past `MAX_PLOT_AXES` (spec §4.3).
    pub fn add_plot_axis(&mut self, tag: impl Into<String>) -> Result<()> {
        if self.plot_axes.len() >= MAX_PLOT_AXES {
            return Err(DasError::ResourceExhausted(format!(
                "dimension '{}' already carries {} plot-axis tags",
                self.name, MAX_PLOT_AXES
            )));
        }
        self.plot_axes.push(tag.into());
        Ok(())
    }

    /// Insert or replace the variable bound to `role`. Errors past
    /// `MAX_ROLES` distinct roles (spec §4.3).
    pub fn set_role(&mut self, role: impl Into<String>, var: Rc<Variable>) -> Result<()> {
        let role = role.into();
        if let Some(entry) = self.roles.iter_mut().find(|(r, _)| *r == role) {
            entry.1 = var;
            return Ok(());
        }
        if self.roles.len() >= MAX_ROLES {
            return Err(DasError::ResourceExhausted(format!(
                "dimension '{}' already carries {} role entries",
                self.name, MAX_ROLES
            )));
        }
        self.roles.push((role, var));
        Ok(())
    }

    pub fn role(&self, role: &str) -> Option<&Rc<Variable>> {
        self.roles.iter().find(|(r, _)| r == role).map(|(_, v)| v)
    }

    pub fn roles(&self) -> impl Iterator<Item = (&str, &Rc<Variable>)> {
        self.roles.iter().map(|(r, v)| (r.as_str(), v))
    }

    /// Pick the variable that best represents a single point location:
    /// `center`, then `mean`, then `median`, then `mode` — first present
    /// wins (spec §4.3).
    pub fn get_point_var(&self) -> Option<&Rc<Variable>> {
        POINT_ROLE_PRIORITY.iter().find_map(|role| self.role(role))
    }

    /// Merge the shapes of every role variable using the §4.2.2 rules.
    pub fn shape(&self) -> Vec<DimLen> {
        self.roles
            .iter()
            .map(|(_, v)| v.shape())
            .fold(Vec::new(), |acc, s| merge_shapes(&acc, &s))
    }

    /// Merge the `length_in` of every role variable at `idx`.
    pub fn length_in(&self, idx: &[i64]) -> Result<DimLen> {
        let mut out: Option<DimLen> = None;
        for (_, v) in &self.roles {
            let len = v.length_in(idx)?;
            out = Some(match out {
                None => len,
                Some(acc) => acc.merge(len),
            });
        }
        out.ok_or_else(|| DasError::InvalidArgument(format!("dimension '{}' has no roles", self.name)))
    }
}
