use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use log::debug;

use crate::{
    config::Config,
    docker::ImageCli,
    git::{Git, GitError},
    process,
    template::{self, TemplateContext, TemplateError},
};

/// Tag given to a freshly built image before it receives its final tags.
pub const WORKING_TAG: &str = "working";

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("'{}' must exist.", .0.display())]
    MissingGitignore(PathBuf),

    #[error("The repo's .gitignore must ignore the {0}.")]
    DockerfileNotIgnored(String),

    #[error("The repo must be clean (no outstanding changes).")]
    Dirty,

    #[error("failed to build")]
    Build(#[source] process::Error),

    #[error("failed to tag with '{tag}'")]
    Tag {
        tag: String,
        source: process::Error,
    },

    #[error("failed to rmi working tag")]
    RemoveWorkingTag(#[source] process::Error),

    #[error("failed to push with branch tag")]
    PushBranchTag(#[source] process::Error),

    #[error("failed to push with hash tag")]
    PushHashTag(#[source] process::Error),

    #[error("failed to delete {path:?}")]
    Clean { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Template,
    Build,
    Clean,
    Push,
    /// Runs [`Task::Template`], [`Task::Build`] and [`Task::Clean`] in order.
    Go,
}

impl Task {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Task::Template => "template",
            Task::Build => "build",
            Task::Clean => "clean",
            Task::Push => "push",
            Task::Go => "go",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Tasks<'a> {
    config: &'a Config,
    git: Git<'a>,
    images: &'a dyn ImageCli,
    template: PathBuf,
    dockerfile: PathBuf,
}

impl<'a> Tasks<'a> {
    pub fn new(config: &'a Config, images: &'a dyn ImageCli) -> Self {
        let template = config.repository_root().join(template::TEMPLATE_FILE);
        let dockerfile = template::dockerfile_path(&template);
        Self {
            config,
            git: Git::new(config.repository_root()),
            images,
            template,
            dockerfile,
        }
    }

    pub fn git(&self) -> &Git<'a> {
        &self.git
    }

    pub fn template_path(&self) -> &Path {
        &self.template
    }

    pub fn dockerfile_path(&self) -> &Path {
        &self.dockerfile
    }

    pub fn run(&self, task: Task) -> Result<(), TaskError> {
        debug!("Beginning '{task}' task.");
        match task {
            Task::Template => self.template()?,
            Task::Build => self.build()?,
            Task::Clean => self.clean()?,
            Task::Push => self.push()?,
            Task::Go => {
                for task in [Task::Template, Task::Build, Task::Clean] {
                    self.run(task)?;
                }
            }
        }
        debug!("Ending '{task}' task.");
        Ok(())
    }

    /// Checks that the template exists, that the generated Dockerfile is ignored by git and that
    /// the working tree is clean.
    pub fn validate_repo(&self) -> Result<(), TaskError> {
        if !self.template.is_file() {
            return Err(TemplateError::Missing(self.template.clone()).into());
        }

        let gitignore = self.config.repository_root().join(".gitignore");
        if !gitignore.is_file() {
            return Err(TaskError::MissingGitignore(gitignore));
        }

        let dockerfile = self
            .dockerfile
            .strip_prefix(self.config.repository_root())
            .unwrap_or(&self.dockerfile);
        if !self.git.is_ignored(dockerfile)? {
            return Err(TaskError::DockerfileNotIgnored(
                dockerfile.display().to_string(),
            ));
        }

        if !self.git.is_clean()? {
            return Err(TaskError::Dirty);
        }

        debug!("Repository successfully validated.");
        Ok(())
    }

    fn template(&self) -> Result<(), TaskError> {
        self.validate_repo()?;

        let parent_tag = self.git.parent_tag()?;
        let context = TemplateContext {
            host: self.config.host(),
            parent_tag,
        };
        template::render_file(&self.template, &self.dockerfile, &context)?;
        Ok(())
    }

    fn build(&self) -> Result<(), TaskError> {
        self.validate_repo()?;

        let tags = self.git.image_tags()?;
        let working = self.config.image(WORKING_TAG);

        self.images
            .build(self.config.repository_root(), &self.dockerfile, &working)
            .map_err(TaskError::Build)?;

        for tag in tags {
            self.images
                .tag(&working, &self.config.image(&tag))
                .map_err(|source| TaskError::Tag { tag, source })?;
        }

        self.images
            .remove(&working)
            .map_err(TaskError::RemoveWorkingTag)?;
        Ok(())
    }

    fn clean(&self) -> Result<(), TaskError> {
        debug!("Deleting {:?}.", self.dockerfile);
        match std::fs::remove_file(&self.dockerfile) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(TaskError::Clean {
                path: self.dockerfile.clone(),
                source,
            }),
        }
    }

    fn push(&self) -> Result<(), TaskError> {
        let branch_tag = self.git.branch_tag()?;
        let hash = self.git.commit_hash()?;

        self.images
            .push(&self.config.image(&branch_tag))
            .map_err(TaskError::PushBranchTag)?;
        self.images
            .push(&self.config.image(&hash))
            .map_err(TaskError::PushHashTag)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, fs, num::NonZeroI32};

    use super::*;
    use crate::{
        config::Options,
        git::test_repo,
        template::{DOCKERFILE, TEMPLATE_FILE},
    };

    const TEMPLATE: &str = "{{ from_directive(image=\"acme/base\") }}\nCOPY . /app\n";

    /// Records image operations instead of running docker. Every call to the operation named
    /// `fail_on` fails after being recorded.
    #[derive(Default)]
    struct RecordingCli {
        calls: RefCell<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl RecordingCli {
        fn failing_on(operation: &'static str) -> Self {
            Self {
                fail_on: Some(operation),
                ..Self::default()
            }
        }

        fn record(&self, operation: &'static str, call: String) -> process::Result<()> {
            self.calls.borrow_mut().push(call);
            if self.fail_on == Some(operation) {
                return Err(process::Error {
                    command: process::Command::new("docker"),
                    kind: process::ErrorKind::NonZeroExitStatus(NonZeroI32::new(1)),
                });
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl ImageCli for RecordingCli {
        fn build(&self, context: &Path, dockerfile: &Path, image: &str) -> process::Result<()> {
            assert_eq!(dockerfile, context.join(DOCKERFILE));
            self.record("build", format!("build {image}"))
        }

        fn tag(&self, source: &str, target: &str) -> process::Result<()> {
            self.record("tag", format!("tag {source} {target}"))
        }

        fn remove(&self, image: &str) -> process::Result<()> {
            self.record("remove", format!("rmi {image}"))
        }

        fn push(&self, image: &str) -> process::Result<()> {
            self.record("push", format!("push {image}"))
        }
    }

    fn repo(branch: &str) -> tempfile::TempDir {
        test_repo::init(
            branch,
            &[(TEMPLATE_FILE, TEMPLATE), (".gitignore", "/Dockerfile\n")],
        )
    }

    fn config(root: &Path, default_host: Option<&str>) -> Config {
        Config::new(
            Options {
                container_name: Some("acme/app".to_string()),
                repository_root: Some(root.to_owned()),
                default_host: default_host.map(str::to_owned),
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn template_renders_parent_image() {
        if !test_repo::git_available() {
            return;
        }
        let repo = repo("feature/login");
        let config = config(repo.path(), Some("registry.example.com"));
        let images = RecordingCli::default();
        let tasks = Tasks::new(&config, &images);

        tasks.run(Task::Template).unwrap();

        let dockerfile = fs::read_to_string(repo.path().join(DOCKERFILE)).unwrap();
        assert_eq!(
            dockerfile,
            "FROM registry.example.com/acme/base:develop\nCOPY . /app\n"
        );
        assert!(images.calls().is_empty());
    }

    #[test]
    fn go_builds_tags_and_cleans() {
        if !test_repo::git_available() {
            return;
        }
        let repo = repo("release/1.0");
        let config = config(repo.path(), None);
        let images = RecordingCli::default();
        let tasks = Tasks::new(&config, &images);
        let hash = tasks.git().commit_hash().unwrap();

        tasks.run(Task::Go).unwrap();

        assert_eq!(
            images.calls(),
            vec![
                "build acme/app:working".to_string(),
                format!("tag acme/app:working acme/app:{hash}"),
                "tag acme/app:working acme/app:release-1.0".to_string(),
                "rmi acme/app:working".to_string(),
            ]
        );
        assert!(!repo.path().join(DOCKERFILE).exists());
        assert_eq!(
            fs::read_to_string(repo.path().join(TEMPLATE_FILE)).unwrap(),
            TEMPLATE
        );
    }

    #[test]
    fn clean_removes_only_the_dockerfile() {
        if !test_repo::git_available() {
            return;
        }
        let repo = repo("develop");
        let config = config(repo.path(), None);
        let images = RecordingCli::default();
        let tasks = Tasks::new(&config, &images);

        tasks.run(Task::Template).unwrap();
        assert_eq!(
            fs::read_to_string(tasks.dockerfile_path()).unwrap(),
            "FROM acme/base:develop\nCOPY . /app\n"
        );

        tasks.run(Task::Clean).unwrap();
        assert!(!tasks.dockerfile_path().exists());
        assert!(tasks.template_path().exists());

        // Cleaning twice is fine.
        tasks.run(Task::Clean).unwrap();
    }

    #[test]
    fn dirty_tree_fails_before_build() {
        if !test_repo::git_available() {
            return;
        }
        let repo = repo("develop");
        fs::write(repo.path().join("uncommitted.txt"), "wip\n").unwrap();
        let config = config(repo.path(), None);
        let images = RecordingCli::default();
        let tasks = Tasks::new(&config, &images);

        assert!(matches!(tasks.run(Task::Build), Err(TaskError::Dirty)));
        assert!(matches!(tasks.run(Task::Go), Err(TaskError::Dirty)));
        assert!(images.calls().is_empty());
        assert!(!tasks.dockerfile_path().exists());
    }

    #[test]
    fn dockerfile_must_be_ignored() {
        if !test_repo::git_available() {
            return;
        }
        let repo = test_repo::init(
            "develop",
            &[(TEMPLATE_FILE, TEMPLATE), (".gitignore", "target/\n")],
        );
        let config = config(repo.path(), None);
        let images = RecordingCli::default();
        let error = Tasks::new(&config, &images).validate_repo().unwrap_err();
        assert!(matches!(error, TaskError::DockerfileNotIgnored(_)));
    }

    #[test]
    fn glob_pattern_ignores_dockerfile() {
        if !test_repo::git_available() {
            return;
        }
        let repo = test_repo::init(
            "develop",
            &[(TEMPLATE_FILE, TEMPLATE), (".gitignore", "**/Dockerfile\n")],
        );
        let config = config(repo.path(), None);
        let images = RecordingCli::default();
        let tasks = Tasks::new(&config, &images);

        tasks.validate_repo().unwrap();
        tasks.run(Task::Template).unwrap();
        assert!(tasks.dockerfile_path().exists());
    }

    #[test]
    fn negated_dockerfile_is_not_ignored() {
        if !test_repo::git_available() {
            return;
        }
        let repo = test_repo::init(
            "develop",
            &[
                (TEMPLATE_FILE, TEMPLATE),
                (".gitignore", "/Dockerfile\n!Dockerfile\n"),
            ],
        );
        let config = config(repo.path(), None);
        let images = RecordingCli::default();
        let error = Tasks::new(&config, &images).validate_repo().unwrap_err();
        assert!(matches!(error, TaskError::DockerfileNotIgnored(_)));
        assert_eq!(
            error.to_string(),
            "The repo's .gitignore must ignore the Dockerfile."
        );
    }

    #[test]
    fn gitignore_must_exist() {
        if !test_repo::git_available() {
            return;
        }
        let repo = test_repo::init("develop", &[(TEMPLATE_FILE, TEMPLATE)]);
        let config = config(repo.path(), None);
        let images = RecordingCli::default();
        let error = Tasks::new(&config, &images).validate_repo().unwrap_err();
        assert!(matches!(error, TaskError::MissingGitignore(_)));
    }

    #[test]
    fn template_must_exist() {
        if !test_repo::git_available() {
            return;
        }
        let repo = test_repo::init("develop", &[(".gitignore", "/Dockerfile\n")]);
        let config = config(repo.path(), None);
        let images = RecordingCli::default();
        let error = Tasks::new(&config, &images)
            .run(Task::Template)
            .unwrap_err();
        assert!(matches!(
            error,
            TaskError::Template(TemplateError::Missing(_))
        ));
        assert!(error.to_string().ends_with("' must exist."));
    }

    #[test]
    fn failed_tag_aborts_before_removing_working_tag() {
        if !test_repo::git_available() {
            return;
        }
        let repo = repo("develop");
        let config = config(repo.path(), None);
        let images = RecordingCli::failing_on("tag");
        let tasks = Tasks::new(&config, &images);
        let hash = tasks.git().commit_hash().unwrap();

        let error = tasks.run(Task::Build).unwrap_err();
        assert_eq!(error.to_string(), format!("failed to tag with '{hash}'"));
        assert_eq!(
            images.calls(),
            vec![
                "build acme/app:working".to_string(),
                format!("tag acme/app:working acme/app:{hash}"),
            ]
        );
    }

    #[test]
    fn failed_build_leaves_dockerfile_behind() {
        if !test_repo::git_available() {
            return;
        }
        let repo = repo("develop");
        let config = config(repo.path(), None);
        let images = RecordingCli::failing_on("build");
        let tasks = Tasks::new(&config, &images);

        let error = tasks.run(Task::Go).unwrap_err();
        assert!(matches!(error, TaskError::Build(_)));
        assert_eq!(images.calls(), vec!["build acme/app:working".to_string()]);
        assert!(tasks.dockerfile_path().exists());
    }

    #[test]
    fn push_sends_branch_then_hash() {
        if !test_repo::git_available() {
            return;
        }
        let repo = repo("hotfix/urgent");
        let config = config(repo.path(), None);
        let images = RecordingCli::default();
        let tasks = Tasks::new(&config, &images);
        let hash = tasks.git().commit_hash().unwrap();

        tasks.run(Task::Push).unwrap();

        assert_eq!(
            images.calls(),
            vec![
                "push acme/app:hotfix-urgent".to_string(),
                format!("push acme/app:{hash}"),
            ]
        );
    }

    #[test]
    fn detached_head_push_keeps_git_error() {
        if !test_repo::git_available() {
            return;
        }
        let repo = repo("develop");
        test_repo::git(repo.path(), &["checkout", "--quiet", "--detach"]);
        let config = config(repo.path(), None);
        let images = RecordingCli::default();

        let error = Tasks::new(&config, &images).run(Task::Push).unwrap_err();
        assert!(matches!(error, TaskError::Git(GitError::Branch(_))));
        assert!(std::error::Error::source(&error).is_some());
        assert!(images.calls().is_empty());
    }

    #[test]
    fn failed_branch_push_skips_hash_push() {
        if !test_repo::git_available() {
            return;
        }
        let repo = repo("develop");
        let config = config(repo.path(), None);
        let images = RecordingCli::failing_on("push");
        let tasks = Tasks::new(&config, &images);

        let error = tasks.run(Task::Push).unwrap_err();
        assert_eq!(error.to_string(), "failed to push with branch tag");
        assert_eq!(images.calls(), vec!["push acme/app:develop".to_string()]);
    }
}
