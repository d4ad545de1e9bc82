use std::collections::BTreeMap;
use std::fmt;

/// Stable storage index of one variable.
pub type Slot = usize;

/// Ordered name -> integer store, used for the global scope and for each
/// function activation.
///
/// Every name is bound to a slot the first time it is resolved. A slot is
/// either live (holds a value) or merely reserved: the compiler reserves slots
/// for every name it sees, but only a read or a write at run time makes the
/// variable exist. Reading a name that does not exist yet creates it with 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    slots: BTreeMap<String, Slot>,
    cells: Vec<Option<i64>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `name`, creating it with 0 if it does not exist.
    pub fn lookup(&mut self, name: &str) -> i64 {
        let slot = self.slot(name);
        *self.cells[slot].get_or_insert(0)
    }

    pub fn assign(&mut self, name: &str, value: i64) {
        let slot = self.slot(name);
        self.cells[slot] = Some(value);
    }

    /// Returns the value of `name` without creating it.
    pub fn get(&self, name: &str) -> Option<i64> {
        self.slots.get(name).and_then(|&slot| self.cells[slot])
    }

    /// Resolves `name` to its slot, reserving one if the name is new.
    pub fn slot(&mut self, name: &str) -> Slot {
        if let Some(&slot) = self.slots.get(name) {
            return slot;
        }
        let slot = self.cells.len();
        self.cells.push(None);
        self.slots.insert(name.to_string(), slot);
        slot
    }

    /// Number of reserved slots, live or not.
    pub fn slot_count(&self) -> usize {
        self.cells.len()
    }

    /// Slot-indexed view of the storage, for the register machine.
    pub fn cells_mut(&mut self) -> &mut [Option<i64>] {
        &mut self.cells
    }

    /// Live variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.slots
            .iter()
            .filter_map(|(name, &slot)| self.cells[slot].map(|value| (name.as_str(), value)))
    }

    pub fn len(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Renders `{ A=5 B=2 }`, sorted by name.
impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{ ")?;
        for (name, value) in self.iter() {
            write!(f, "{name}={value} ")?;
        }
        f.write_str("}")
    }
}
