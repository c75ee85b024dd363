//! Partitioning of the available bandwidth between cells.
use crate::id::{define_id_getter, define_id_type, insert_unique};
use crate::topology::CellID;
use crate::units::Megahertz;
use anyhow::{Context, Result, ensure};
use float_cmp::approx_eq;
use indexmap::IndexMap;
use log::debug;
use std::fmt;

define_id_type! {SpectrumBlockID}

/// The total bandwidth shared by a scenario
pub const TOTAL_BANDWIDTH: Megahertz = Megahertz::new(5.0);

/// The number of cells in a frequency reuse cluster
pub const REUSE_CLUSTER_SIZE: u32 = 3;

/// Supported channel bandwidths and the number of resource blocks in each
const RESOURCE_BLOCKS: [(f64, u32); 6] = [
    (1.4, 6),
    (3.0, 15),
    (5.0, 25),
    (10.0, 50),
    (15.0, 75),
    (20.0, 100),
];

/// A map of [`SpectrumBlock`]s, keyed by ID
pub type SpectrumBlockMap = IndexMap<SpectrumBlockID, SpectrumBlock>;

/// A portion of the spectrum assigned to one or more stations
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumBlock {
    /// Unique identifier for the block
    pub id: SpectrumBlockID,
    /// Position of the block within its reuse cluster
    pub cluster_index: u32,
    /// Bandwidth of the block
    pub bandwidth: Megahertz,
    /// Number of resource blocks in each direction
    pub resource_blocks: u32,
    /// First downlink resource block
    pub dl_offset: u32,
    /// First uplink resource block
    pub ul_offset: u32,
}
define_id_getter! {SpectrumBlock, SpectrumBlockID}

impl fmt::Display for SpectrumBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "spectrum block {} (cluster slot {}): {}, {} RBs, DL offset {}, UL offset {}",
            self.id,
            self.cluster_index,
            self.bandwidth,
            self.resource_blocks,
            self.dl_offset,
            self.ul_offset
        )
    }
}

/// Number of resource blocks for a channel bandwidth
pub fn resource_blocks_for(bandwidth: Megahertz) -> Result<u32> {
    RESOURCE_BLOCKS
        .iter()
        .find(|(mhz, _)| approx_eq!(f64, *mhz, bandwidth.value(), epsilon = 1e-9))
        .map(|(_, rbs)| *rbs)
        .with_context(|| format!("Unsupported channel bandwidth: {bandwidth}"))
}

/// Divides the spectrum between macro cells
pub trait FrequencyReusePartitioner {
    /// Return one spectrum block per macro cell, in cell order
    fn partition(
        &self,
        nb_cells: u32,
        cluster_size: u32,
        bandwidth: Megahertz,
    ) -> Result<Vec<SpectrumBlock>>;
}

/// Classic reuse: cells take consecutive slots of the cluster, each slot shifted in frequency by
/// a whole channel
#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterReuse;

impl FrequencyReusePartitioner for ClusterReuse {
    fn partition(
        &self,
        nb_cells: u32,
        cluster_size: u32,
        bandwidth: Megahertz,
    ) -> Result<Vec<SpectrumBlock>> {
        ensure!(cluster_size > 0, "Reuse cluster size cannot be zero");
        let resource_blocks = resource_blocks_for(bandwidth)?;

        Ok((0..nb_cells)
            .map(|cell| {
                let cluster_index = cell % cluster_size;
                let offset = cluster_index * resource_blocks;
                SpectrumBlock {
                    id: SpectrumBlockID(cell),
                    cluster_index,
                    bandwidth,
                    resource_blocks,
                    dl_offset: offset,
                    ul_offset: offset,
                }
            })
            .collect())
    }
}

/// The spectrum assignment for a scenario
#[derive(Debug, PartialEq)]
pub struct SpectrumAllocation {
    /// All spectrum blocks
    pub blocks: SpectrumBlockMap,
    /// Block for each macro cell, indexed by cell ID
    macro_blocks: Vec<SpectrumBlockID>,
    /// Block shared by every femto cell
    femto_block: SpectrumBlockID,
}

impl SpectrumAllocation {
    /// The block assigned to the given macro cell
    pub fn macro_block(&self, cell_id: CellID) -> Result<SpectrumBlockID> {
        self.macro_blocks
            .get(cell_id.index())
            .copied()
            .with_context(|| format!("No spectrum block for macro cell {cell_id}"))
    }

    /// The block shared by every femto cell
    pub fn femto_block(&self) -> SpectrumBlockID {
        self.femto_block
    }
}

/// Partition the bandwidth between `nb_cell` macro cells.
///
/// The block in cluster slot 0 is reused as the single block shared by all femto cells.
pub fn allocate_spectrum<P: FrequencyReusePartitioner>(
    partitioner: &P,
    nb_cell: u32,
    cluster_size: u32,
    bandwidth: Megahertz,
) -> Result<SpectrumAllocation> {
    let partition = partitioner.partition(nb_cell, cluster_size, bandwidth)?;
    ensure!(
        partition.len() == nb_cell as usize,
        "Frequency reuse returned {} spectrum blocks for {nb_cell} cells",
        partition.len()
    );

    let mut blocks = SpectrumBlockMap::new();
    let mut macro_blocks = Vec::with_capacity(partition.len());
    for block in partition {
        debug!("Created {block}");
        macro_blocks.push(block.id);
        insert_unique(&mut blocks, block)?;
    }
    let femto_block = *macro_blocks
        .first()
        .context("No spectrum block available for femto cells")?;

    Ok(SpectrumAllocation {
        blocks,
        macro_blocks,
        femto_block,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;

    #[rstest]
    #[case(1.4, 6)]
    #[case(5.0, 25)]
    #[case(20.0, 100)]
    fn test_resource_blocks_for(#[case] mhz: f64, #[case] expected: u32) {
        assert_eq!(resource_blocks_for(Megahertz(mhz)).unwrap(), expected);
    }

    #[test]
    fn test_resource_blocks_for_unsupported() {
        assert_error!(
            resource_blocks_for(Megahertz(7.0)),
            "Unsupported channel bandwidth: 7 MHz"
        );
    }

    #[test]
    fn test_cluster_reuse_offsets() {
        let blocks = ClusterReuse.partition(4, 3, Megahertz(5.0)).unwrap();
        let offsets: Vec<_> = blocks.iter().map(|b| (b.cluster_index, b.dl_offset)).collect();
        assert_eq!(offsets, [(0, 0), (1, 25), (2, 50), (0, 0)]);
    }

    #[test]
    fn test_allocate_spectrum_single_cell() {
        let allocation =
            allocate_spectrum(&ClusterReuse, 1, REUSE_CLUSTER_SIZE, TOTAL_BANDWIDTH).unwrap();
        assert_eq!(allocation.blocks.len(), 1);
        assert_eq!(allocation.macro_block(CellID(0)).unwrap(), SpectrumBlockID(0));
        assert_eq!(allocation.femto_block(), SpectrumBlockID(0));
        assert!(allocation.macro_block(CellID(1)).is_err());
    }

    #[test]
    fn test_allocate_spectrum_no_cells() {
        assert_error!(
            allocate_spectrum(&ClusterReuse, 0, REUSE_CLUSTER_SIZE, TOTAL_BANDWIDTH),
            "No spectrum block available for femto cells"
        );
    }
}
