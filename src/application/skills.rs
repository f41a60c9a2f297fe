pub const SKILL_OPTIONS: [&str; 46] = [
    "JavaScript", "TypeScript", "React", "Redux", "Next.js", "Node.js", "Express", "Java",
    "Spring", "Spring Boot", "Hibernate", "Python", "Django", "Flask", "FastAPI", "Go", "C#",
    "ASP.NET", "C++", "SQL", "MySQL", "PostgreSQL", "MongoDB", "Redis", "GraphQL", "REST",
    "HTML", "CSS", "Sass", "Tailwind", "Bootstrap", "AWS", "Azure", "GCP", "Docker",
    "Kubernetes", "Git", "CI/CD", "Jest", "Mocha", "Cypress", "Playwright", "JUnit", "Android",
    "iOS", "React Native",
];

const MAX_SUGGESTIONS: usize = 12;

/// Vocabulary entries containing `input`, ignoring case. Nothing is
/// suggested for an empty input.
pub fn suggestions(input: &str) -> Vec<&'static str> {
    if input.is_empty() {
        return Vec::new();
    }
    let needle = input.to_lowercase();
    SKILL_OPTIONS
        .iter()
        .copied()
        .filter(|option| option.to_lowercase().contains(&needle))
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// Chosen skills in the order they were added. Matching is exact, so
/// "react" and "React" are different entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillSet {
    items: Vec<String>,
}

impl SkillSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the trimmed value. Returns false for blanks and duplicates.
    pub fn add(&mut self, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() || self.contains(value) {
            return false;
        }
        self.items.push(value.to_string());
        true
    }

    pub fn remove(&mut self, value: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|s| s != value);
        self.items.len() != before
    }

    pub fn pop(&mut self) -> Option<String> {
        self.items.pop()
    }

    pub fn contains(&self, value: &str) -> bool {
        self.items.iter().any(|s| s == value)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.items.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_trims_and_dedupes() {
        let mut skills = SkillSet::new();
        assert!(skills.add(" React "));
        assert!(!skills.add("React"));
        assert!(!skills.add("   "));
        assert!(skills.add("react"));
        assert_eq!(skills.as_slice(), &["React".to_string(), "react".to_string()]);
    }

    #[test]
    fn test_insertion_order_and_pop() {
        let mut skills = SkillSet::new();
        for s in ["Go", "Rust", "SQL"] {
            skills.add(s);
        }
        assert!(skills.remove("Rust"));
        assert!(!skills.remove("Rust"));
        assert_eq!(skills.pop().as_deref(), Some("SQL"));
        assert_eq!(skills.to_vec(), vec!["Go".to_string()]);
    }

    #[test]
    fn test_suggestions_case_insensitive_substring() {
        assert_eq!(suggestions("REACT"), vec!["React", "React Native"]);
        assert!(suggestions("").is_empty());
        assert!(suggestions("cobol").is_empty());
    }

    #[test]
    fn test_suggestions_capped() {
        // "s" appears in far more than twelve entries
        assert_eq!(suggestions("s").len(), 12);
        assert_eq!(suggestions("s")[0], "JavaScript");
    }
}
