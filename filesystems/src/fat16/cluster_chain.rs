// FAT16 cluster chain resolution
// Follows the allocation table once per open and records the sector of
// every cluster, so reads never walk the table again.

use crate::fat16::volume::Volume;
use crate::fat_common::{is_end_of_chain, is_unusable_link, FIRST_DATA_CLUSTER};
use fatlens_core::{FatError, FatResult};
use log::{debug, trace, warn};

/// One cluster of a chain and the first sector backing it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterLink {
    pub cluster: u16,
    pub sector: u64,
}

/// Ordered clusters backing a file or subdirectory
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClusterChain {
    links: Vec<ClusterLink>,
}

impl ClusterChain {
    /// Follow the table from `start` until an end-of-chain value.
    ///
    /// The start cluster is always part of the chain. Clusters 0 and 1 hold
    /// no data (an empty file records 0), so a chain starting there ends
    /// immediately without consulting the table. A link to 0 or 1 found
    /// further along ends the chain with a warning, or is `InvalidFormat`
    /// under strict chains.
    pub fn resolve(volume: &Volume<'_>, start: u16) -> FatResult<Self> {
        let fat = volume.fat();
        let strict = volume.options().strict_chains;
        let mut links: Vec<ClusterLink> = Vec::new();
        let mut current = start;

        loop {
            links.try_reserve(1)?;
            links.push(ClusterLink {
                cluster: current,
                sector: volume.cluster_sector(current),
            });

            if current < FIRST_DATA_CLUSTER {
                break;
            }

            // A chain cannot hold more clusters than the table has entries
            if links.len() > fat.len() {
                return Err(FatError::InvalidFormat(format!(
                    "cluster chain from {} loops (more than {} links)",
                    start,
                    fat.len()
                )));
            }

            let next = fat.entry(current)?;
            trace!("FAT[{}] = {:#06x}", current, next);

            if is_end_of_chain(next) {
                break;
            }
            if strict && is_unusable_link(next) {
                return Err(FatError::InvalidFormat(format!(
                    "cluster {} links to unusable value {:#06x}",
                    current, next
                )));
            }
            // 0 and 1 have no data area; following them would alias cluster 2
            if next < FIRST_DATA_CLUSTER {
                warn!(
                    "Chain from cluster {} broken at {}: link {:#06x} treated as end of chain",
                    start, current, next
                );
                break;
            }
            current = next;
        }

        debug!("Resolved chain from cluster {}: {} clusters", start, links.len());
        Ok(Self { links })
    }

    pub fn links(&self) -> &[ClusterLink] {
        &self.links
    }

    pub fn get(&self, index: usize) -> Option<&ClusterLink> {
        self.links.get(index)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn clusters(&self) -> impl Iterator<Item = u16> + '_ {
        self.links.iter().map(|l| l.cluster)
    }

    pub fn sectors(&self) -> impl Iterator<Item = u64> + '_ {
        self.links.iter().map(|l| l.sector)
    }
}
