//! Selection/notification bus.
//!
//! Two replay-latest streams: the materialised project tree and the selected
//! project. A new subscriber sees the latest snapshot immediately. A slow
//! subscriber may miss intermediate snapshots but always observes the most
//! recent one.

use kc_core::{project::Project, tree::TreeNode};
use tokio::sync::watch;

pub type TreeReceiver = watch::Receiver<Vec<TreeNode>>;
pub type CurrentReceiver = watch::Receiver<Option<Project>>;

#[derive(Debug)]
pub struct SelectionBus {
  tree:    watch::Sender<Vec<TreeNode>>,
  current: watch::Sender<Option<Project>>,
}

impl Default for SelectionBus {
  fn default() -> Self { Self::new() }
}

impl SelectionBus {
  pub fn new() -> Self {
    Self {
      tree:    watch::Sender::new(Vec::new()),
      current: watch::Sender::new(None),
    }
  }

  pub fn subscribe_tree(&self) -> TreeReceiver { self.tree.subscribe() }

  pub fn subscribe_current(&self) -> CurrentReceiver { self.current.subscribe() }

  /// Publish a fresh snapshot on both streams. Subscribers are notified even
  /// when the snapshot equals the previous one.
  pub fn publish(&self, tree: Vec<TreeNode>, current: Option<Project>) {
    self.tree.send_replace(tree);
    self.current.send_replace(current);
  }
}
