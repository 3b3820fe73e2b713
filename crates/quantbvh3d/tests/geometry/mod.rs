mod avl_tree;
mod grid_ray_cast;
mod moving_volume;
