/// The namespace a tree is checked inside.
///
/// Resolution of a name `n` within container `a.b` tries `a.b.n`, then
/// `a.n`, then `n` — longest candidate first. A leading dot makes a name
/// container-absolute: `.n` only ever tries `n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    name: String,
}

impl Container {
    pub fn new(name: impl Into<String>) -> Container {
        Container { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Candidate qualified names for `name`, longest first.
    pub fn resolve_candidate_names(&self, name: &str) -> Vec<String> {
        if let Some(absolute) = name.strip_prefix('.') {
            return vec![absolute.to_string()];
        }
        if self.name.is_empty() {
            return vec![name.to_string()];
        }
        let mut candidates = Vec::new();
        let mut prefix = self.name.as_str();
        loop {
            candidates.push(format!("{}.{}", prefix, name));
            match prefix.rfind('.') {
                Some(i) => prefix = &prefix[..i],
                None => break,
            }
        }
        candidates.push(name.to_string());
        candidates
    }
}
