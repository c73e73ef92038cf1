//! One record of a table: an ordered, named sequence of cells
//!
//! A `Row` is stamped out of a template (schema only, values unset) and
//! populated by the codec. Lookups work by ordinal, by name, or by semantic
//! flag; field order is significant and never reordered.

use crate::cell::{Cell, FieldType, FlagKind, Value};

/// An ordered collection of [`Cell`]s sharing one schema.
#[derive(Debug, Clone)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    /// Stamp a fresh row out of a template. Value slots are deep-copied, so
    /// populating this row never aliases the template or a sibling.
    pub fn new(template: &[Cell]) -> Self {
        Row {
            cells: template.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Value at an ordinal position.
    pub fn value(&self, index: usize) -> &Value {
        &self.cells[index].value
    }

    pub fn set_value(&mut self, index: usize, value: Value) {
        self.cells[index].value = value;
    }

    /// First cell with the given name.
    pub fn cell(&self, name: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.name == name)
    }

    pub fn cell_mut(&mut self, name: &str) -> Option<&mut Cell> {
        self.cells.iter_mut().find(|c| c.name == name)
    }

    /// Value of the first cell with the given name.
    pub fn value_by_name(&self, name: &str) -> Option<&Value> {
        self.cell(name).map(|c| &c.value)
    }

    /// Set the value of every cell with the given name (duplicate names are
    /// tolerated and all receive the value).
    pub fn set_value_by_name(&mut self, name: &str, value: Value) {
        for cell in self.cells.iter_mut().filter(|c| c.name == name) {
            cell.value = value.clone();
        }
    }

    /// Value of the first cell carrying the given flag.
    pub fn value_by_flag(&self, flag: FlagKind) -> Option<&Value> {
        self.cells.iter().find(|c| c.flag == flag).map(|c| &c.value)
    }

    pub fn set_value_by_flag(&mut self, flag: FlagKind, value: Value) {
        for cell in self.cells.iter_mut().filter(|c| c.flag == flag) {
            cell.value = value.clone();
        }
    }

    /// Name of the first cell carrying the given flag.
    pub fn name_by_flag(&self, flag: FlagKind) -> Option<&str> {
        self.cells
            .iter()
            .find(|c| c.flag == flag)
            .map(|c| c.name.as_str())
    }

    /// Name of the field that declares a dependency on `dependency` — i.e.
    /// the owner of a derived field such as a `string_len`.
    pub fn name_by_dependency(&self, dependency: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|c| c.dependency.as_deref() == Some(dependency))
            .map(|c| c.name.as_str())
    }

    /// All cells whose dependency names `vector`: the `bit_from_vector`
    /// fields to pack back into that vector's word at write time.
    pub fn bit_fields<'a>(&'a self, vector: &'a str) -> impl Iterator<Item = &'a Cell> + 'a {
        self.cells.iter().filter(move |c| {
            c.kind == FieldType::BitFromVector && c.dependency.as_deref() == Some(vector)
        })
    }

    /// Cells exposed to external consumers.
    pub fn visible_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| c.visible)
    }

    pub fn visible_names(&self) -> Vec<String> {
        self.visible_cells().map(|c| c.name.clone()).collect()
    }

    pub fn cell_names(&self) -> Vec<String> {
        self.cells.iter().map(|c| c.name.clone()).collect()
    }

    /// Whether more than one cell shares `name`.
    pub fn has_duplicate(&self, name: &str) -> bool {
        self.cells.iter().filter(|c| c.name == name).count() > 1
    }

    /// Copy this row's values positionally into a sibling row of the same
    /// schema. Dependencies are not re-resolved.
    pub fn clone_into(&self, output: &mut Row) {
        for (i, cell) in self.cells.iter().enumerate().take(output.len()) {
            output.cells[i].value = cell.value.clone();
        }
    }
}
