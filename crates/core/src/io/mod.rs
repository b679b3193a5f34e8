//! I/O operations for image stacks, label maps and tabular data

mod directory;
mod geotiff;
mod npy;
mod table;

pub use directory::{list_image_files, load_image_dir, read_image};
pub use geotiff::{
    read_labels, read_multiband, read_multiband_from_buffer, write_labels, write_multiband,
    write_multiband_to_buffer, write_rgb8,
};
pub use npy::{read_npy_image, read_npy_image_from_buffer, write_npy_image};
pub use table::{read_csv_table, read_csv_table_from_reader};
