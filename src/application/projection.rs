use crate::domain::todo::Todo;

/// Todos whose title contains `term`, ignoring case, in list order.
pub fn filter<'a>(todos: &'a [Todo], term: &str) -> Vec<&'a Todo> {
    let needle = term.to_lowercase();
    todos.iter().filter(|t| t.title.to_lowercase().contains(&needle)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(todos: &[&Todo]) -> Vec<String> { todos.iter().map(|t| t.title.clone()).collect() }

    #[test]
    fn matches_substring_case_insensitively() {
        let list = vec![Todo::local("Milk"), Todo::local("Eggs")];
        let first = filter(&list, "mi");
        let second = filter(&list, "mi");
        assert_eq!(titles(&first), vec!["Milk"]);
        assert_eq!(first, second);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn empty_term_keeps_everything_in_order() {
        let list = vec![Todo::with_id(2, "b"), Todo::with_id(1, "a")];
        assert_eq!(titles(&filter(&list, "")), vec!["b", "a"]);
    }

    #[test]
    fn substring_not_token_match() {
        let list = vec![Todo::local("Call the plumber"), Todo::local("Plan trip")];
        assert_eq!(titles(&filter(&list, "UMB")), vec!["Call the plumber"]);
        assert!(filter(&list, "plumber trip").is_empty());
    }
}
