use crate::config::TasksConfig;
use crate::error::PrepareError;
use crate::protocol::TASK_WIDTH;
use rand::Rng;
use rand::seq::SliceRandom;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;
use tracing::{debug, info};

/// A task line, space-padded to [`TASK_WIDTH`] bytes. Clones share the buffer.
///
/// Tasks are raw bytes; only logging and results decode them, lossily.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task(Arc<[u8]>);

impl Task {
    /// Pads `line` to the wire width, or returns `None` if it does not fit.
    pub fn padded(line: impl AsRef<[u8]>) -> Option<Self> {
        let line = line.as_ref();
        if line.len() > TASK_WIDTH {
            return None;
        }
        let mut padded = Vec::with_capacity(TASK_WIDTH);
        padded.extend_from_slice(line);
        padded.resize(TASK_WIDTH, b' ');
        Some(Self(padded.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.0.trim_ascii_end())
    }

    pub fn category(&self) -> Cow<'_, str> {
        let line = self.0.trim_ascii_end();
        let category = match line.iter().position(|b| *b == b':') {
            Some(idx) => &line[..idx],
            None => line,
        };
        String::from_utf8_lossy(category)
    }
}

/// Reads task lines: `#` starts a comment, blank lines are skipped and
/// every remaining line must fit in [`TASK_WIDTH`] bytes.
pub fn parse_tasks<R: BufRead>(mut reader: R) -> Result<Vec<Task>, PrepareError> {
    let mut tasks = Vec::new();
    let mut buf = Vec::new();
    let mut line_number = 0;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|source| PrepareError::Io {
                path: "<input>".into(),
                source,
            })?;
        if read == 0 {
            break;
        }
        line_number += 1;

        let line = match buf.iter().position(|b| *b == b'#') {
            Some(idx) => &buf[..idx],
            None => &buf[..],
        };
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }

        let task = Task::padded(line).ok_or_else(|| PrepareError::TaskTooLong {
            line: line_number,
            len: line.len(),
            max: TASK_WIDTH,
            text: String::from_utf8_lossy(line).into_owned(),
        })?;
        tasks.push(task);
    }

    Ok(tasks)
}

pub fn shuffle<R: Rng + ?Sized>(tasks: &mut [Task], rng: &mut R) {
    tasks.shuffle(rng);
}

/// Keeps the first `max_per_category` tasks of each category, grouped by
/// category in order of first appearance. With an allow-list, other
/// categories are dropped.
pub fn prune(
    tasks: Vec<Task>,
    max_per_category: usize,
    categories: Option<&[String]>,
) -> Vec<Task> {
    let mut by_category: Vec<(String, Vec<Task>)> = Vec::new();

    for task in tasks {
        let category = task.category().into_owned();
        if let Some(allowed) = categories {
            if !allowed.contains(&category) {
                continue;
            }
        }

        let idx = match by_category.iter().position(|(c, _)| *c == category) {
            Some(idx) => idx,
            None => {
                by_category.push((category, Vec::new()));
                by_category.len() - 1
            }
        };
        let bucket = &mut by_category[idx].1;
        if bucket.len() < max_per_category {
            bucket.push(task);
        }
    }

    for (category, bucket) in &by_category {
        debug!("Category {}: {} tasks", category, bucket.len());
    }

    by_category.into_iter().flat_map(|(_, bucket)| bucket).collect()
}

/// The shuffled, pruned list the pacer cycles through. Never empty.
#[derive(Debug, Clone)]
pub struct TaskSet {
    tasks: Vec<Task>,
}

impl TaskSet {
    pub fn new(tasks: Vec<Task>) -> Result<Self, PrepareError> {
        if tasks.is_empty() {
            return Err(PrepareError::NoTasks);
        }
        Ok(Self { tasks })
    }

    /// Parses, shuffles with `rng` and prunes the configured tasks file.
    pub fn load<R: Rng + ?Sized>(config: &TasksConfig, rng: &mut R) -> Result<Self, PrepareError> {
        let io_error = |source| PrepareError::Io {
            path: config.file.clone(),
            source,
        };
        let file = File::open(&config.file).map_err(io_error)?;

        let mut tasks = match parse_tasks(BufReader::new(file)) {
            Err(PrepareError::Io { source, .. }) => return Err(io_error(source)),
            other => other?,
        };
        let parsed = tasks.len();

        shuffle(&mut tasks, rng);
        let tasks = prune(tasks, config.max_per_category, config.categories.as_deref());
        info!(
            "Loaded {} tasks from {} ({} after pruning)",
            parsed,
            config.file.display(),
            tasks.len()
        );

        Self::new(tasks)
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::io::Cursor;

    fn tasks(lines: &[&str]) -> Vec<Task> {
        lines.iter().map(|l| Task::padded(l).unwrap()).collect()
    }

    fn texts(tasks: &[Task]) -> Vec<String> {
        tasks.iter().map(|t| t.text().into_owned()).collect()
    }

    #[test]
    fn pads_to_wire_width() {
        let task = Task::padded("Term: foo").unwrap();
        assert_eq!(task.as_bytes().len(), TASK_WIDTH);
        assert_eq!(task.text(), "Term: foo");
        assert_eq!(task.category(), "Term");
        assert!(task.as_bytes()[9..].iter().all(|b| *b == b' '));
    }

    #[test]
    fn exact_width_fits() {
        let line = "x".repeat(TASK_WIDTH);
        assert_eq!(Task::padded(&line).unwrap().as_bytes(), line.as_bytes());
        assert!(Task::padded(&"x".repeat(TASK_WIDTH + 1)).is_none());
    }

    #[test]
    fn strips_comments_and_blank_lines() {
        let input = concat!(
            "# header\n\nTerm: united  # popular\n   \n",
            "Phrase: \"new york\"\n#Term: skipped\n",
        );
        let parsed = parse_tasks(Cursor::new(input)).unwrap();
        assert_eq!(texts(&parsed), vec!["Term: united", "Phrase: \"new york\""]);
    }

    #[test]
    fn non_utf8_lines_are_kept_as_bytes() {
        let input: &[u8] = b"Term: caf\xe9\nTerm: ok\n";
        let parsed = parse_tasks(Cursor::new(input)).unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(&parsed[0].as_bytes()[..10], b"Term: caf\xe9");
        assert_eq!(parsed[0].as_bytes().len(), TASK_WIDTH);
        assert_eq!(parsed[0].category(), "Term");
        assert_eq!(parsed[0].text(), "Term: caf\u{FFFD}");
        assert_eq!(parsed[1].text(), "Term: ok");
    }

    #[test]
    fn oversized_line_reports_line_number() {
        let input = format!("Term: ok\n\nTerm: {}\n", "y".repeat(TASK_WIDTH));
        let err = parse_tasks(Cursor::new(input)).unwrap_err();
        match err {
            PrepareError::TaskTooLong { line, len, max, .. } => {
                assert_eq!(line, 3);
                assert_eq!(len, TASK_WIDTH + 6);
                assert_eq!(max, TASK_WIDTH);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn shuffle_is_reproducible_for_a_seed() {
        let original = tasks(&["A: 1", "A: 2", "A: 3", "B: 1", "B: 2", "B: 3", "C: 1"]);

        let mut first = original.clone();
        shuffle(&mut first, &mut StdRng::seed_from_u64(0));
        let mut second = original.clone();
        shuffle(&mut second, &mut StdRng::seed_from_u64(0));

        assert_eq!(first, second);
        let mut sorted = texts(&first);
        sorted.sort();
        assert_eq!(sorted, texts(&original));
    }

    #[test]
    fn prune_caps_each_category_and_groups() {
        let input = tasks(&["A: 1", "B: 1", "A: 2", "A: 3", "C: 1", "B: 2"]);
        let pruned = prune(input, 2, None);
        assert_eq!(texts(&pruned), vec!["A: 1", "A: 2", "B: 1", "B: 2", "C: 1"]);
    }

    #[test]
    fn prune_honours_allow_list() {
        let input = tasks(&["Term: a", "Phrase: b", "Term: c", "Fuzzy: d"]);
        let allowed = vec!["Term".to_string(), "Fuzzy".to_string()];
        let pruned = prune(input, 10, Some(&allowed));
        assert_eq!(texts(&pruned), vec!["Term: a", "Term: c", "Fuzzy: d"]);
    }

    #[test]
    fn empty_task_set_is_an_error() {
        assert!(matches!(TaskSet::new(Vec::new()), Err(PrepareError::NoTasks)));
    }

    #[test]
    fn load_reports_missing_file() {
        let config = TasksConfig {
            file: "/nonexistent/tasksend/tasks.txt".into(),
            max_per_category: 1,
            categories: None,
            seed: 0,
        };
        let err = TaskSet::load(&config, &mut StdRng::seed_from_u64(0)).unwrap_err();
        match err {
            PrepareError::Io { path, .. } => assert_eq!(path, config.file),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_filters_to_allowed_category() {
        let path = std::env::temp_dir().join(format!("tasksend-load-{}.tasks", std::process::id()));
        std::fs::write(&path, "Term: a\nPhrase: b\nTerm: c\nTerm: d # comment\n").unwrap();

        let config = TasksConfig {
            file: path.clone(),
            max_per_category: 2,
            categories: Some(vec!["Term".to_string()]),
            seed: 0,
        };
        let set = TaskSet::load(&config, &mut StdRng::seed_from_u64(0)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(set.len(), 2);
        assert!(set.as_slice().iter().all(|t| t.category() == "Term"));
    }
}
