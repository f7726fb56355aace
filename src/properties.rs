// Properties module
// The settings form a script shows in the host's script dialog

use std::fmt;

/// Kind of a single property widget
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    /// Drop-down of `(label, value)` string items
    List {
        items: Vec<(String, String)>,
    },
    Int {
        min: i64,
        max: i64,
        step: i64,
    },
    Button,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub description: String,
    pub kind: PropertyKind,
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\"", self.name, self.description)?;
        match &self.kind {
            PropertyKind::List { items } => write!(f, " list of {}", items.len()),
            PropertyKind::Int { min, max, step } => {
                write!(f, " int {}..={} step {}", min, max, step)
            }
            PropertyKind::Button => write!(f, " button"),
        }
    }
}

/// Ordered collection of properties, looked up by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    props: Vec<Property>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, name: &str, description: &str, kind: PropertyKind) {
        self.props.push(Property {
            name: name.to_string(),
            description: description.to_string(),
            kind,
        });
    }

    pub fn add_list(&mut self, name: &str, description: &str) {
        self.add(name, description, PropertyKind::List { items: Vec::new() });
    }

    pub fn add_int(&mut self, name: &str, description: &str, min: i64, max: i64, step: i64) {
        self.add(name, description, PropertyKind::Int { min, max, step });
    }

    pub fn add_button(&mut self, name: &str, description: &str) {
        self.add(name, description, PropertyKind::Button);
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.props.iter().find(|prop| prop.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.props.iter()
    }

    fn list_mut(&mut self, name: &str) -> Option<&mut Vec<(String, String)>> {
        self.props
            .iter_mut()
            .find(|prop| prop.name == name)
            .and_then(|prop| match &mut prop.kind {
                PropertyKind::List { items } => Some(items),
                _ => None,
            })
    }

    /// Remove every item of a list property; false if there is no such list
    pub fn list_clear(&mut self, name: &str) -> bool {
        match self.list_mut(name) {
            Some(items) => {
                items.clear();
                true
            }
            None => false,
        }
    }

    pub fn list_add_string(&mut self, name: &str, label: &str, value: &str) -> bool {
        match self.list_mut(name) {
            Some(items) => {
                items.push((label.to_string(), value.to_string()));
                true
            }
            None => false,
        }
    }

    /// Values of a list property in display order
    pub fn list_values(&self, name: &str) -> Vec<&str> {
        match self.get(name).map(|prop| &prop.kind) {
            Some(PropertyKind::List { items }) => {
                items.iter().map(|(_, value)| value.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }
}
