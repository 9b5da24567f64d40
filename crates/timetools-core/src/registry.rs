//! Static program registry and program search.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexSet;

use crate::lifecycle::{ComponentRef, InstanceWrapper, WrapperConfig};

pub type PreMountActive = Rc<dyn Fn() -> bool + 'static>;

#[derive(Clone)]
pub struct ProgramDescriptor {
    id: String,
    name: String,
    description: String,
    icon: String,
    keywords: Vec<String>,
    component: ComponentRef,
    persistent: bool,
    pre_mount_active: Option<PreMountActive>,
}

impl ProgramDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, component: ComponentRef) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            icon: String::new(),
            keywords: Vec::new(),
            component,
            persistent: false,
            pre_mount_active: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Lets the program report itself active before it is ever mounted.
    pub fn pre_mount_active(mut self, predicate: impl Fn() -> bool + 'static) -> Self {
        self.pre_mount_active = Some(Rc::new(predicate));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description_text(&self) -> &str {
        &self.description
    }

    pub fn icon_name(&self) -> &str {
        &self.icon
    }

    pub fn keyword_list(&self) -> &[String] {
        &self.keywords
    }

    pub fn component(&self) -> &ComponentRef {
        &self.component
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn reports_pre_mount_active(&self) -> bool {
        self.pre_mount_active
            .as_ref()
            .map(|predicate| predicate())
            .unwrap_or(false)
    }

    pub fn wrapper(&self) -> InstanceWrapper {
        let component_id = if self.id.trim().is_empty() {
            None
        } else {
            Some(self.id.clone())
        };
        InstanceWrapper::new(
            Rc::clone(&self.component),
            WrapperConfig {
                component_id,
                persistent: self.persistent,
            },
        )
    }
}

impl fmt::Debug for ProgramDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgramDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("persistent", &self.persistent)
            .field("pre_mount_active", &self.pre_mount_active.is_some())
            .finish()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProgramRegistry {
    programs: Vec<ProgramDescriptor>,
}

const ID_WEIGHT: f32 = 2.0;
const NAME_WEIGHT: f32 = 2.0;
const KEYWORD_WEIGHT: f32 = 1.0;
const DESCRIPTION_WEIGHT: f32 = 0.5;
const FUZZY_THRESHOLD: f32 = 0.3;

impl ProgramRegistry {
    pub fn new(programs: Vec<ProgramDescriptor>) -> Self {
        Self { programs }
    }

    pub fn find(&self, id: &str) -> Option<&ProgramDescriptor> {
        self.programs.iter().find(|program| program.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProgramDescriptor> {
        self.programs.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.programs.iter().map(|program| program.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Prefix matches first, in registry order, then fuzzy matches by score.
    pub fn search(&self, query: &str) -> Vec<&ProgramDescriptor> {
        let term = query.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }

        let mut ranked: IndexSet<usize> = self
            .programs
            .iter()
            .enumerate()
            .filter(|(_, program)| prefix_match(program, &term))
            .map(|(index, _)| index)
            .collect();

        let mut fuzzy: Vec<(usize, f32)> = self
            .programs
            .iter()
            .enumerate()
            .filter_map(|(index, program)| fuzzy_score(program, &term).map(|score| (index, score)))
            .collect();
        fuzzy.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.extend(fuzzy.into_iter().map(|(index, _)| index));

        ranked
            .into_iter()
            .map(|index| &self.programs[index])
            .collect()
    }
}

fn prefix_match(program: &ProgramDescriptor, term: &str) -> bool {
    program.id.to_lowercase().starts_with(term)
        || program.name.to_lowercase().starts_with(term)
        || program
            .keywords
            .iter()
            .any(|keyword| keyword.to_lowercase().starts_with(term))
}

fn fuzzy_score(program: &ProgramDescriptor, term: &str) -> Option<f32> {
    let mut fields: Vec<(&str, f32)> = vec![
        (program.id.as_str(), ID_WEIGHT),
        (program.name.as_str(), NAME_WEIGHT),
        (program.description.as_str(), DESCRIPTION_WEIGHT),
    ];
    fields.extend(
        program
            .keywords
            .iter()
            .map(|keyword| (keyword.as_str(), KEYWORD_WEIGHT)),
    );
    fields
        .into_iter()
        .filter_map(|(field, weight)| {
            let ratio = approximate_error_ratio(term, &field.to_lowercase());
            (ratio <= FUZZY_THRESHOLD).then(|| weight * (1.0 - ratio))
        })
        .max_by(|a, b| a.total_cmp(b))
}

/// Smallest edit distance between `pattern` and any substring of `text`,
/// relative to the pattern length. Accepting ratios up to 0.3 approximates
/// Fuse.js's default Bitap threshold without its location penalty.
fn approximate_error_ratio(pattern: &str, text: &str) -> f32 {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    if pattern.is_empty() {
        return 0.0;
    }
    if text.is_empty() {
        return 1.0;
    }
    // Column per pattern prefix; a free start row lets the match begin anywhere.
    let mut previous: Vec<usize> = (0..=pattern.len()).collect();
    let mut best = previous[pattern.len()];
    for &tc in &text {
        let mut current = vec![0; pattern.len() + 1];
        for (i, &pc) in pattern.iter().enumerate() {
            let substitution = previous[i] + usize::from(pc != tc);
            let insertion = previous[i + 1] + 1;
            let deletion = current[i] + 1;
            current[i + 1] = substitution.min(insertion).min(deletion);
        }
        best = best.min(current[pattern.len()]);
        previous = current;
    }
    best as f32 / pattern.len() as f32
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
