//! Tracks the Templates currently in force, keyed by Observation Domain ID
//! and Template ID: no eviction policy, no TTL — a plain lookup table the
//! `MessageBuffer` consults on both encode and decode.

use std::collections::HashMap;
use std::rc::Rc;

use crate::template::Template;

/// `(Observation Domain ID, Template ID) -> Template` lookup table.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<(u32, u16), Rc<Template>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        TemplateRegistry { templates: HashMap::new() }
    }

    pub fn insert(&mut self, odid: u32, template: Template) -> Rc<Template> {
        let entry = Rc::new(template);
        self.templates.insert((odid, entry.id), Rc::clone(&entry));
        entry
    }

    pub fn get(&self, odid: u32, id: u16) -> Option<Rc<Template>> {
        self.templates.get(&(odid, id)).cloned()
    }

    pub fn remove(&mut self, odid: u32, id: u16) -> Option<Rc<Template>> {
        self.templates.remove(&(odid, id))
    }

    pub fn contains(&self, odid: u32, id: u16) -> bool {
        self.templates.contains_key(&(odid, id))
    }

    /// All Templates registered for `odid`, for bulk re-encoding (e.g. when
    /// a caller resends its whole Template set at the start of a session).
    pub fn iter_domain(&self, odid: u32) -> impl Iterator<Item = &Rc<Template>> {
        self.templates.iter().filter(move |((o, _), _)| *o == odid).map(|(_, t)| t)
    }
}
