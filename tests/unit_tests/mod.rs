mod boundary;
mod cg;
mod communicator;
mod estimate;
mod mean;
mod point;
