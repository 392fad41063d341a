mod node_id;
