use std::path::{Path, PathBuf};

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{FetchOptions, RemoteCallbacks, Repository};

use crate::error::{ModGraphError, Result};

/// Git repository holding module manifests
pub struct ManifestRepository {
    repo: Option<Repository>,
    repo_url: String,
    branch: String,
    work_dir: PathBuf,
}

fn fetch_options<'a>() -> FetchOptions<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.transfer_progress(|stats| {
        tracing::debug!(
            "Received {} of {} objects ({} bytes)",
            stats.received_objects(),
            stats.total_objects(),
            stats.received_bytes()
        );
        true
    });

    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    options
}

impl ManifestRepository {
    pub fn new(repo_url: String, branch: String, work_dir: PathBuf) -> Self {
        Self { repo: None, repo_url, branch, work_dir }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Clones the repository into the working directory
    pub fn clone_repo(&mut self) -> Result<()> {
        if self.repo_url.is_empty() {
            return Err(ModGraphError::Git("No repository URL configured".to_string()));
        }

        tracing::info!("Cloning {} ({}) into {}", self.repo_url, self.branch, self.work_dir.display());
        let repo = RepoBuilder::new()
            .branch(&self.branch)
            .fetch_options(fetch_options())
            .clone(&self.repo_url, &self.work_dir)?;

        self.repo = Some(repo);
        Ok(())
    }

    /// Opens an existing checkout in the working directory; false if there is none
    pub fn open(&mut self) -> Result<bool> {
        if self.repo.is_some() {
            return Ok(true);
        }
        if !self.work_dir.join(".git").exists() {
            return Ok(false);
        }
        self.repo = Some(Repository::open(&self.work_dir)?);
        Ok(true)
    }

    /// Fast-forwards the checkout to the remote branch
    pub fn pull(&mut self) -> Result<()> {
        if !self.open()? {
            return Err(ModGraphError::Git("Repository not initialized".to_string()));
        }
        let repo = self
            .repo
            .as_ref()
            .ok_or_else(|| ModGraphError::Git("Repository not initialized".to_string()))?;

        let mut remote = repo.find_remote("origin")?;
        remote.fetch(&[self.branch.as_str()], Some(&mut fetch_options()), None)?;

        let fetch_head = repo.find_reference("FETCH_HEAD")?;
        let fetch_commit = repo.reference_to_annotated_commit(&fetch_head)?;

        let refname = format!("refs/heads/{}", self.branch);
        match repo.find_reference(&refname) {
            Ok(mut reference) => {
                reference.set_target(fetch_commit.id(), "modgraph: fast-forward")?;
            }
            Err(_) => {
                repo.reference(&refname, fetch_commit.id(), true, "modgraph: track branch")?;
            }
        }
        repo.set_head(&refname)?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        repo.checkout_head(Some(&mut checkout))?;

        tracing::info!("Updated manifests to {}", fetch_commit.id());
        Ok(())
    }

    /// Commits a file, given relative to the working directory
    pub fn commit_file(&self, relative_path: &Path, message: &str) -> Result<()> {
        let repo = self
            .repo
            .as_ref()
            .ok_or_else(|| ModGraphError::Git("Repository not initialized".to_string()))?;

        let mut index = repo.index()?;
        index.add_path(relative_path)?;
        index.write()?;
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;

        let signature = git2::Signature::now("modgraph", "modgraph@example.com")?;
        let parent = repo.head()?.peel_to_commit()?;

        repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &[&parent])?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use git2::RepositoryInitOptions;
    use tempfile::TempDir;

    use super::*;

    fn commit_all(repo: &Repository, file: &str, message: &str) {
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(file)).unwrap();
        index.write().unwrap();

        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let signature = git2::Signature::now("test", "test@example.com").unwrap();
        let parents = match repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => vec![],
        };
        let parents: Vec<&git2::Commit> = parents.iter().collect();

        repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents).unwrap();
    }

    fn setup_test_repo() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let repo_path = temp_dir.path().join("manifests");

        let mut options = RepositoryInitOptions::new();
        options.initial_head("main");
        let repo = Repository::init_opts(&repo_path, &options).unwrap();

        fs::write(repo_path.join("menu.yaml"), "name: menu\n").unwrap();
        commit_all(&repo, "menu.yaml", "Initial commit");

        (temp_dir, repo_path)
    }

    fn provider_for(repo_path: &Path) -> ManifestRepository {
        ManifestRepository::new(
            repo_path.to_str().unwrap().to_string(),
            "main".to_string(),
            repo_path.parent().unwrap().join("work-dir"),
        )
    }

    #[test]
    fn test_open_without_checkout() {
        let (_temp_dir, repo_path) = setup_test_repo();
        let mut provider = provider_for(&repo_path);
        assert!(!provider.open().unwrap());
        assert!(provider.pull().is_err());
    }

    #[test]
    fn test_clone_repo() {
        let (_temp_dir, repo_path) = setup_test_repo();
        let mut provider = provider_for(&repo_path);

        provider.clone_repo().unwrap();
        assert!(provider.work_dir().join(".git").exists());
        assert!(provider.work_dir().join("menu.yaml").exists());
    }

    #[test]
    fn test_pull_picks_up_new_manifests() {
        let (_temp_dir, repo_path) = setup_test_repo();
        provider_for(&repo_path).clone_repo().unwrap();

        let origin = Repository::open(&repo_path).unwrap();
        fs::write(repo_path.join("storage.yaml"), "name: storage\n").unwrap();
        commit_all(&origin, "storage.yaml", "Add storage");

        // A fresh provider opens the existing checkout
        let mut provider = provider_for(&repo_path);
        provider.pull().unwrap();
        assert!(provider.work_dir().join("storage.yaml").exists());
    }

    #[test]
    fn test_commit_file() {
        let (_temp_dir, repo_path) = setup_test_repo();
        let mut provider = provider_for(&repo_path);
        provider.clone_repo().unwrap();

        fs::write(provider.work_dir().join("entity.yaml"), "name: entity\n").unwrap();
        provider.commit_file(Path::new("entity.yaml"), "Add entity").unwrap();

        let repo = Repository::open(provider.work_dir()).unwrap();
        let commit = repo.head().unwrap().peel_to_commit().unwrap();
        assert_eq!(commit.message().unwrap(), "Add entity");
    }
}
