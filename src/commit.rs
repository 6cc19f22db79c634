use std::{
    fmt::Display,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    object_id::ObjectId,
};

/// Who made a change and when. Only ever stored as text inside a commit.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub email: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// Offset from UTC as git writes it, e.g. `+0530`.
    pub timezone: String,
}

impl Person {
    /// A person stamped with the current system time in UTC.
    pub fn now(name: impl Into<String>, email: impl Into<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as i64)
            .unwrap_or(0);
        Self {
            name: name.into(),
            email: email.into(),
            timestamp,
            timezone: String::from("+0000"),
        }
    }

    /// Parses `<name> <<email>> <seconds> <offset>`.
    pub fn parse(s: &str) -> Result<Self> {
        let malformed = || Error::MalformedCommit(format!("bad identity line {:?}", s));

        let open = s.find('<').ok_or_else(malformed)?;
        let close = s[open..].find('>').ok_or_else(malformed)? + open;
        let name = s[..open].trim_end().to_string();
        let email = s[open + 1..close].to_string();

        let mut when = s[close + 1..].split_whitespace();
        let timestamp = when
            .next()
            .and_then(|secs| secs.parse::<i64>().ok())
            .ok_or_else(malformed)?;
        let timezone = when.next().ok_or_else(malformed)?.to_string();
        if when.next().is_some() {
            return Err(malformed());
        }

        Ok(Person {
            name,
            email,
            timestamp,
            timezone,
        })
    }
}

impl Display for Person {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} <{}> {} {}",
            self.name, self.email, self.timestamp, self.timezone
        )
    }
}

/// A snapshot of one tree with its lineage and metadata.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// The root [`crate::tree::Tree`] of the snapshot.
    pub tree: ObjectId,
    /// The previous commits, if there were some.
    pub parents: Vec<ObjectId>,
    pub author: Person,
    pub committer: Person,
    /// The message added with the commit, without its final newline.
    pub message: String,
}

impl Commit {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(&format!("tree {}\n", self.tree));
        for parent in &self.parents {
            out.push_str(&format!("parent {}\n", parent));
        }
        out.push_str(&format!("author {}\n", self.author));
        out.push_str(&format!("committer {}\n", self.committer));
        out.push('\n');
        out.push_str(&self.message);
        out.push('\n');
        out.into_bytes()
    }

    /// Reads a commit's content back. Headers other than `tree`, `parent`,
    /// `author` and `committer` (and their continuation lines) are skipped.
    pub fn parse(content: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(content)
            .map_err(|_| Error::MalformedCommit(String::from("content is not UTF-8")))?;
        let (headers, message) = text
            .split_once("\n\n")
            .ok_or_else(|| Error::MalformedCommit(String::from("no blank line before message")))?;

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;
        for line in headers.lines() {
            let Some((key, value)) = line.split_once(' ') else {
                return Err(Error::MalformedCommit(format!("bad header line {:?}", line)));
            };
            match key {
                "tree" => tree = Some(value.parse::<ObjectId>()?),
                "parent" => parents.push(value.parse::<ObjectId>()?),
                "author" => author = Some(Person::parse(value)?),
                "committer" => committer = Some(Person::parse(value)?),
                _ => log::debug!("skipping commit header {:?}", key),
            }
        }

        let missing = |field: &str| Error::MalformedCommit(format!("missing {} header", field));
        Ok(Commit {
            tree: tree.ok_or_else(|| missing("tree"))?,
            parents,
            author: author.ok_or_else(|| missing("author"))?,
            committer: committer.ok_or_else(|| missing("committer"))?,
            message: message.strip_suffix('\n').unwrap_or(message).to_string(),
        })
    }
}

#[cfg(test)]
fn sample_commit(parents: Vec<ObjectId>) -> Commit {
    let person = Person {
        name: String::from("Ada Lovelace"),
        email: String::from("ada@example.com"),
        timestamp: 1_700_000_000,
        timezone: String::from("+0530"),
    };
    Commit {
        tree: "4b825dc642cb6eb9a060e54bf8d69288fbee4904".parse().unwrap(),
        parents,
        author: person.clone(),
        committer: person,
        message: String::from("first"),
    }
}

#[test]
fn test_commit_text() {
    let parent: ObjectId = "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391".parse().unwrap();
    let commit = sample_commit(vec![parent]);
    let expected = "tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
                    parent e69de29bb2d1d6434b8b29ae775ad8c2e48c5391\n\
                    author Ada Lovelace <ada@example.com> 1700000000 +0530\n\
                    committer Ada Lovelace <ada@example.com> 1700000000 +0530\n\
                    \n\
                    first\n";
    assert_eq!(String::from_utf8(commit.encode()).unwrap(), expected);
}

#[test]
fn test_commit_round_trip() {
    let p1 = ObjectId::hash(b"commit 0\0");
    let p2 = ObjectId::hash(b"commit 1\0x");
    for parents in [vec![], vec![p1], vec![p1, p2]] {
        let mut commit = sample_commit(parents);
        commit.message = String::from("subject\n\nbody line\n");
        assert_eq!(Commit::parse(&commit.encode()).unwrap(), commit);
    }
}

#[test]
fn test_commit_skips_unknown_headers() {
    let text = "tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
                author A <a@b> 1 +0000\n\
                committer A <a@b> 1 +0000\n\
                gpgsig -----BEGIN PGP SIGNATURE-----\n \n -----END PGP SIGNATURE-----\n\
                \n\
                msg\n";
    let commit = Commit::parse(text.as_bytes()).unwrap();
    assert_eq!(commit.message, "msg");
    assert!(commit.parents.is_empty());
}

#[test]
fn test_commit_missing_tree() {
    let text = "author A <a@b> 1 +0000\ncommitter A <a@b> 1 +0000\n\nmsg\n";
    assert!(matches!(
        Commit::parse(text.as_bytes()).unwrap_err(),
        Error::MalformedCommit(_)
    ));
}

#[test]
fn test_person_parse() {
    let person = Person::parse("Grace Brewster Hopper <grace@navy.mil> -100 -0500").unwrap();
    assert_eq!(person.name, "Grace Brewster Hopper");
    assert_eq!(person.email, "grace@navy.mil");
    assert_eq!(person.timestamp, -100);
    assert_eq!(person.timezone, "-0500");
    assert!(Person::parse("no email 1 +0000").is_err());
    assert!(Person::parse("A <a@b> soon +0000").is_err());
}
