use std::path::Path;

use crate::process;

/// The image operations the build and push tasks need from a container engine.
pub trait ImageCli {
    /// Builds the image in `context` using `dockerfile` and tags it as `image`.
    fn build(&self, context: &Path, dockerfile: &Path, image: &str) -> process::Result<()>;

    /// Adds the tag `target` to the existing image `source`.
    fn tag(&self, source: &str, target: &str) -> process::Result<()>;

    /// Removes the tag `image`. The image itself is only deleted once no tag refers to it.
    fn remove(&self, image: &str) -> process::Result<()>;

    fn push(&self, image: &str) -> process::Result<()>;
}

/// Drives the `docker` command line.
pub struct Docker;

impl ImageCli for Docker {
    fn build(&self, context: &Path, dockerfile: &Path, image: &str) -> process::Result<()> {
        process::command!("docker", "build", "--file", dockerfile, "--tag", image, ".")
            .current_dir(context)
            .status()
    }

    fn tag(&self, source: &str, target: &str) -> process::Result<()> {
        process::command!("docker", "tag", source, target).status()
    }

    fn remove(&self, image: &str) -> process::Result<()> {
        process::command!("docker", "rmi", image).status()
    }

    fn push(&self, image: &str) -> process::Result<()> {
        process::command!("docker", "push", image).status()
    }
}
