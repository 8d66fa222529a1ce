//! Named items stored inside a parent object's list field
//!
//! Some child resources have no endpoint of their own: they live as entries
//! of a list on the parent and are written by sending the whole parent back.
//! [`ParentCollection`] is the locate-or-insert-by-name logic for that list.
//! Names are unique within the list.

/// An item addressed by name within its parent
pub trait Named {
    fn name(&self) -> Option<&str>;
}

/// Outcome of [`ParentCollection::upsert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Inserted,
    Replaced,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParentCollection<T> {
    items: Vec<T>,
}

impl<T: Named> ParentCollection<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    /// From an optional list field, as the remote API returns them
    pub fn from_option(items: Option<Vec<T>>) -> Self {
        Self::new(items.unwrap_or_default())
    }

    pub fn find(&self, name: &str) -> Option<&T> {
        self.items.iter().find(|item| item.name() == Some(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Replace the entry called `name` in place, or append it
    pub fn upsert(&mut self, name: &str, item: T) -> Upserted {
        match self.items.iter().position(|i| i.name() == Some(name)) {
            Some(index) => {
                self.items[index] = item;
                Upserted::Replaced
            }
            None => {
                self.items.push(item);
                Upserted::Inserted
            }
        }
    }

    /// Remove the entry called `name`; absent names leave the list untouched
    pub fn remove(&mut self, name: &str) -> Option<T> {
        let index = self.items.iter().position(|i| i.name() == Some(name))?;
        Some(self.items.remove(index))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}
